use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use coinregime::application::pipeline::RegimePipeline;
use coinregime::config::{PathsConfig, PipelineConfig};
use coinregime::domain::features::FeatureTable;
use coinregime::domain::market::symbol_filter::filter_spot_usdt;
use coinregime::domain::ports::ArchiveSource;
use coinregime::domain::run_log::RunLog;
use coinregime::infrastructure::archive::scanner::{read_metadata, write_metadata};
use coinregime::infrastructure::archive::{CsvDirectoryArchive, scan_archive};
use coinregime::infrastructure::persistence::feature_store::{
    read_features, read_json, write_clusters, write_features, write_json,
};

#[derive(Parser)]
#[command(author, version, about = "Monthly market-regime clustering of crypto pairs", long_about = None)]
struct Cli {
    /// TOML file with pipeline parameters (COINREGIME_* variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory of per-symbol minute-bar CSV files
    #[arg(short, long, global = true, default_value = "archive")]
    archive: PathBuf,

    /// Directory for metadata, feature, cluster and log files
    #[arg(short, long, global = true, default_value = ".")]
    output: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the archive and write symbol metadata (all pairs and USDT spot pairs)
    Scan {
        /// Only scan the first N symbols
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Extract monthly features for the USDT spot pairs
    Features {
        /// Symbols to process (comma separated); defaults to the filtered metadata file
        #[arg(short, long)]
        symbols: Option<String>,
    },

    /// Standardize the feature file, select k and label every row
    Cluster,

    /// Scan, extract and cluster in one go
    Run {
        /// Only scan the first N symbols
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref())?;
    let paths = PathsConfig::in_dir(&cli.archive, &cli.output);
    std::fs::create_dir_all(&cli.output)
        .with_context(|| format!("Failed to create {}", cli.output.display()))?;
    let pipeline = RegimePipeline::new(config);

    match cli.command {
        Commands::Scan { limit } => {
            let archive = CsvDirectoryArchive::open(&paths.archive_dir)?;
            scan(&archive, &paths, limit)?;
        }
        Commands::Features { symbols } => {
            let archive = CsvDirectoryArchive::open(&paths.archive_dir)?;
            let universe = match symbols {
                Some(list) => list
                    .split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect(),
                None => universe(&archive, &paths)?,
            };
            let (_, run_log) = features(&pipeline, &archive, &universe, &paths)?;
            write_json(&paths.run_log_file, &run_log)?;
        }
        Commands::Cluster => {
            let table = read_features(&paths.features_file)?;
            let mut run_log = if paths.run_log_file.exists() {
                read_json::<RunLog>(&paths.run_log_file)?
            } else {
                RunLog::default()
            };
            cluster(&pipeline, &table, &paths, &mut run_log)?;
            write_json(&paths.run_log_file, &run_log)?;
        }
        Commands::Run { limit } => {
            let archive = CsvDirectoryArchive::open(&paths.archive_dir)?;
            let universe = scan(&archive, &paths, limit)?;
            let (table, mut run_log) = features(&pipeline, &archive, &universe, &paths)?;
            let clustered = cluster(&pipeline, &table, &paths, &mut run_log);
            write_json(&paths.run_log_file, &run_log)?;
            clustered?;
        }
    }
    Ok(())
}

/// Writes both metadata files and returns the USDT spot pairs.
fn scan(
    archive: &CsvDirectoryArchive,
    paths: &PathsConfig,
    limit: Option<usize>,
) -> Result<Vec<String>> {
    let report = scan_archive(archive, limit);
    write_metadata(&paths.metadata_file, &report.metadata)?;
    info!("Saved to {}", paths.metadata_file.display());

    let usdt = report.usdt_pairs();
    info!("All pairs: {}", report.metadata.len());
    info!("The USDT-based pairs: {}", usdt.len());
    write_metadata(&paths.filtered_metadata_file, &usdt)?;
    Ok(usdt.into_iter().map(|m| m.symbol).collect())
}

/// Filtered metadata file if present, otherwise every USDT spot pair in the archive.
fn universe(archive: &CsvDirectoryArchive, paths: &PathsConfig) -> Result<Vec<String>> {
    if paths.filtered_metadata_file.exists() {
        let metadata = read_metadata(&paths.filtered_metadata_file)?;
        return Ok(metadata.into_iter().map(|m| m.symbol).collect());
    }
    warn!(
        "{} not found, using every USDT spot pair in {}",
        paths.filtered_metadata_file.display(),
        archive.root().display()
    );
    Ok(filter_spot_usdt(archive.symbols()))
}

fn features(
    pipeline: &RegimePipeline,
    archive: &dyn ArchiveSource,
    symbols: &[String],
    paths: &PathsConfig,
) -> Result<(FeatureTable, RunLog)> {
    if symbols.is_empty() {
        bail!("No symbols to process");
    }
    let aggregation = pipeline.extract_features(archive, symbols);
    write_features(&paths.features_file, &aggregation.table)?;
    Ok((aggregation.table, aggregation.run_log))
}

fn cluster(
    pipeline: &RegimePipeline,
    table: &FeatureTable,
    paths: &PathsConfig,
    run_log: &mut RunLog,
) -> Result<()> {
    let outcome = pipeline.cluster(table)?;
    run_log.clear_cluster_stage();
    run_log.merge(outcome.run_log);

    write_clusters(&paths.clusters_file, &outcome.records)?;
    outcome.report.print_table();
    write_json(&paths.summary_file, &outcome.report)?;
    info!("Summary saved to {}", paths.summary_file.display());
    Ok(())
}
