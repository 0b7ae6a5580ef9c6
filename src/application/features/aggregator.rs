use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::application::features::extractor::{MonthlyExtraction, MonthlyFeatureExtractor};
use crate::application::features::normalizer::SeriesNormalizer;
use crate::domain::features::{FeatureRecord, FeatureTable};
use crate::domain::market::series::YearMonth;
use crate::domain::ports::ArchiveSource;
use crate::domain::run_log::{DuplicateTimestamps, InsufficientMonth, RunLog};

/// Everything extracted from one symbol.
#[derive(Debug, Clone, Default)]
pub struct SymbolFeatures {
    pub records: Vec<FeatureRecord>,
    pub insufficient: Vec<(YearMonth, usize)>,
    pub duplicates_dropped: usize,
}

/// Result of one symbol in a batch
#[derive(Debug, Clone)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub result: Result<SymbolFeatures, String>,
}

/// Feature table and the log of what was left out.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub table: FeatureTable,
    pub run_log: RunLog,
}

/// Drives the monthly extractor across every symbol of the universe.
///
/// Symbols are independent, so they run on the Rayon pool when `parallel`
/// is set. Outcomes are merged in input order: the table is identical to a
/// sequential run.
pub struct FeatureAggregator {
    extractor: MonthlyFeatureExtractor,
    parallel: bool,
}

impl FeatureAggregator {
    pub fn new(extractor: MonthlyFeatureExtractor, parallel: bool) -> Self {
        Self {
            extractor,
            parallel,
        }
    }

    pub fn aggregate(&self, archive: &dyn ArchiveSource, symbols: &[String]) -> Aggregation {
        info!(
            "Extracting monthly features for {} symbols (parallel: {})",
            symbols.len(),
            self.parallel
        );

        let outcomes: Vec<SymbolOutcome> = if self.parallel {
            symbols
                .par_iter()
                .map(|symbol| self.run_single(archive, symbol))
                .collect()
        } else {
            symbols
                .iter()
                .map(|symbol| self.run_single(archive, symbol))
                .collect()
        };

        let aggregation = Self::merge(symbols.len(), outcomes);
        info!(
            "Feature extraction done: {} records from {} symbols, {} skipped",
            aggregation.run_log.records_emitted,
            aggregation.run_log.symbols_processed,
            aggregation.run_log.skipped_symbols.len()
        );
        aggregation
    }

    fn run_single(&self, archive: &dyn ArchiveSource, symbol: &str) -> SymbolOutcome {
        let result = self.process_symbol(archive, symbol);
        if let Err(e) = &result {
            warn!("Skip {}: {}", symbol, e);
        }
        SymbolOutcome {
            symbol: symbol.to_string(),
            result,
        }
    }

    /// Loads, normalizes and extracts every month of every year the symbol spans.
    pub fn process_symbol(
        &self,
        archive: &dyn ArchiveSource,
        symbol: &str,
    ) -> Result<SymbolFeatures, String> {
        let table = archive.load(symbol).map_err(|e| format!("{:#}", e))?;
        let normalized = SeriesNormalizer::normalize(&table).map_err(|e| e.to_string())?;
        let series = normalized.series;
        if series.is_empty() {
            return Err("table has no rows".to_string());
        }

        let mut features = SymbolFeatures {
            duplicates_dropped: normalized.duplicates_dropped,
            ..Default::default()
        };
        for year in series.years() {
            for month in 1..=12 {
                let month = YearMonth::new(year, month);
                match self.extractor.extract(symbol, &series, month) {
                    MonthlyExtraction::Emitted(record) => features.records.push(record),
                    MonthlyExtraction::Insufficient { bars } if bars > 0 => {
                        debug!("{} {}: only {} bars, no record", symbol, month, bars);
                        features.insufficient.push((month, bars));
                    }
                    MonthlyExtraction::Insufficient { .. } => {}
                }
            }
        }
        Ok(features)
    }

    fn merge(requested: usize, outcomes: Vec<SymbolOutcome>) -> Aggregation {
        let mut aggregation = Aggregation::default();
        aggregation.run_log.symbols_requested = requested;

        for outcome in outcomes {
            match outcome.result {
                Ok(features) => {
                    let log = &mut aggregation.run_log;
                    log.symbols_processed += 1;
                    log.records_emitted += features.records.len();
                    log.insufficient_months
                        .extend(features.insufficient.iter().map(|(month, bars)| {
                            InsufficientMonth {
                                symbol: outcome.symbol.clone(),
                                month: month.to_string(),
                                bars: *bars,
                            }
                        }));
                    if features.duplicates_dropped > 0 {
                        log.duplicate_timestamps.push(DuplicateTimestamps {
                            symbol: outcome.symbol.clone(),
                            dropped: features.duplicates_dropped,
                        });
                    }
                    aggregation.table.extend(features.records);
                }
                Err(reason) => aggregation.run_log.skip_symbol(&outcome.symbol, reason),
            }
        }
        aggregation
    }
}
