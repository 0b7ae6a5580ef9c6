//! Stage-1 archive scan: time span and size of every symbol table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::application::features::normalizer::SeriesNormalizer;
use crate::domain::market::symbol_filter::is_spot_usdt_pair;
use crate::domain::ports::ArchiveSource;

/// One row of the metadata file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMetadata {
    pub symbol: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub row_count: usize,
    /// Whole days between first and last bar.
    pub duration_days: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub metadata: Vec<SymbolMetadata>,
    pub failed: Vec<(String, String)>,
}

impl ScanReport {
    /// Rows whose symbol passes the spot USDT filter.
    pub fn usdt_pairs(&self) -> Vec<SymbolMetadata> {
        self.metadata
            .iter()
            .filter(|m| is_spot_usdt_pair(&m.symbol))
            .cloned()
            .collect()
    }
}

/// Reads the time axis of up to `limit` symbols.
pub fn scan_archive(archive: &dyn ArchiveSource, limit: Option<usize>) -> ScanReport {
    let symbols = archive.symbols();
    let take = limit.unwrap_or(symbols.len());

    let mut report = ScanReport::default();
    for symbol in symbols.into_iter().take(take) {
        match scan_symbol(archive, &symbol) {
            Ok(Some(metadata)) => report.metadata.push(metadata),
            Ok(None) => {
                warn!("Failed: {} | Error: empty table", symbol);
                report.failed.push((symbol, "empty table".to_string()));
            }
            Err(e) => {
                warn!("Failed: {} | Error: {:#}", symbol, e);
                report.failed.push((symbol, format!("{:#}", e)));
            }
        }
    }
    info!(
        "Scanned {} symbols, {} failed",
        report.metadata.len(),
        report.failed.len()
    );
    report
}

fn scan_symbol(archive: &dyn ArchiveSource, symbol: &str) -> Result<Option<SymbolMetadata>> {
    let table = archive.load(symbol)?;
    let axis = SeriesNormalizer::time_axis(&table)?;
    let (Some(start), Some(end)) = (axis.iter().min(), axis.iter().max()) else {
        return Ok(None);
    };
    Ok(Some(SymbolMetadata {
        symbol: symbol.to_string(),
        start_time: *start,
        end_time: *end,
        row_count: axis.len(),
        duration_days: (*end - *start).num_days(),
    }))
}

pub fn write_metadata(path: &Path, metadata: &[SymbolMetadata]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in metadata {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_metadata(path: &Path) -> Result<Vec<SymbolMetadata>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    reader
        .deserialize()
        .collect::<Result<Vec<SymbolMetadata>, _>>()
        .with_context(|| format!("Failed to parse {}", path.display()))
}
