//! Flat-file snapshots between stages: CSV tables and JSON documents.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::domain::clustering::ClusteredRecord;
use crate::domain::features::{FeatureRecord, FeatureTable};

pub fn write_features(path: &Path, table: &FeatureTable) -> Result<()> {
    write_rows(path, table.records())?;
    info!("Saved {} feature rows to {}", table.len(), path.display());
    Ok(())
}

pub fn read_features(path: &Path) -> Result<FeatureTable> {
    let records: Vec<FeatureRecord> = read_rows(path)?;
    info!("Loaded {} feature rows from {}", records.len(), path.display());
    Ok(FeatureTable::from_records(records))
}

pub fn write_clusters(path: &Path, records: &[ClusteredRecord]) -> Result<()> {
    write_rows(path, records)?;
    info!("Saved {} clustered rows to {}", records.len(), path.display());
    Ok(())
}

pub fn read_clusters(path: &Path) -> Result<Vec<ClusteredRecord>> {
    read_rows(path)
}

/// Pretty-printed JSON document.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run_log::RunLog;

    fn record(symbol: &str, skew: f64) -> FeatureRecord {
        FeatureRecord {
            symbol: symbol.to_string(),
            month: "2023-11".to_string(),
            log_return_std: 0.001,
            volatility_15m: 0.0008,
            range_mean: 0.002,
            jump_freq: 0.01,
            volume_std: 4.2,
            taker_buy_ratio_mean: 0.49,
            number_of_trades: 120.0,
            return_skew: skew,
            return_kurtosis: 12.0,
            volume_spike_ratio: 0.05,
            extreme_flag: 0,
        }
    }

    #[test]
    fn test_feature_file_header_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features_by_month.csv");
        let table = FeatureTable::from_records(vec![record("AUSDT", 0.3), record("BUSDT", -1.2)]);

        write_features(&path, &table).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("symbol,month,log_return_std"));
        assert!(header.ends_with("volume_spike_ratio,extreme_flag"));

        let loaded = read_features(&path).unwrap();
        assert_eq!(loaded.records(), table.records());
    }

    #[test]
    fn test_nan_feature_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        let table = FeatureTable::from_records(vec![record("AUSDT", f64::NAN)]);

        write_features(&path, &table).unwrap();
        let loaded = read_features(&path).unwrap();
        assert!(loaded.records()[0].return_skew.is_nan());
    }

    #[test]
    fn test_unclustered_rows_have_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/features_with_clusters.csv");
        let rows = vec![
            ClusteredRecord::from_record(&record("AUSDT", 0.1), Some(2), Some([0.5, -0.25])),
            ClusteredRecord::from_record(&record("BUSDT", 0.1), None, None),
        ];

        write_clusters(&path, &rows).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.lines().nth(2).unwrap().ends_with("0,,,"));
        assert_eq!(read_clusters(&path).unwrap(), rows);
    }

    #[test]
    fn test_run_log_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_log.json");
        let mut log = RunLog::default();
        log.skip_symbol("XUSDT", "missing column close");

        write_json(&path, &log).unwrap();
        let parsed: RunLog = read_json(&path).unwrap();
        assert_eq!(parsed, log);
    }
}
