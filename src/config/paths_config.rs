//! File locations of the pipeline's inputs and flat-file snapshots.

use std::path::{Path, PathBuf};

/// Where each stage reads from and writes to
#[derive(Debug, Clone, PartialEq)]
pub struct PathsConfig {
    pub archive_dir: PathBuf,
    pub metadata_file: PathBuf,
    pub filtered_metadata_file: PathBuf,
    pub features_file: PathBuf,
    pub clusters_file: PathBuf,
    pub summary_file: PathBuf,
    pub run_log_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self::in_dir(Path::new("archive"), Path::new("."))
    }
}

impl PathsConfig {
    /// Default file names, with outputs placed under `output_dir`.
    pub fn in_dir(archive_dir: &Path, output_dir: &Path) -> Self {
        Self {
            archive_dir: archive_dir.to_path_buf(),
            metadata_file: output_dir.join("coin_metadata.csv"),
            filtered_metadata_file: output_dir.join("coin_metadata_usdt.csv"),
            features_file: output_dir.join("features_by_month.csv"),
            clusters_file: output_dir.join("features_with_clusters.csv"),
            summary_file: output_dir.join("cluster_summary.json"),
            run_log_file: output_dir.join("run_log.json"),
        }
    }
}
