use serde::{Deserialize, Serialize};

/// A symbol that produced no records at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

/// A month with bars, but fewer than the minimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsufficientMonth {
    pub symbol: String,
    pub month: String,
    pub bars: usize,
}

/// Rows sharing a timestamp that normalization collapsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateTimestamps {
    pub symbol: String,
    pub dropped: usize,
}

/// A feature row kept in the table but left out of clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedRow {
    pub symbol: String,
    pub month: String,
    pub non_finite: Vec<String>,
}

/// A candidate cluster count that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfeasibleCandidate {
    pub k: usize,
    pub reason: String,
}

/// Everything the run left out, so nothing disappears without a trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    pub symbols_requested: usize,
    pub symbols_processed: usize,
    pub records_emitted: usize,
    pub skipped_symbols: Vec<SkippedSymbol>,
    pub insufficient_months: Vec<InsufficientMonth>,
    pub duplicate_timestamps: Vec<DuplicateTimestamps>,
    pub excluded_rows: Vec<ExcludedRow>,
    pub infeasible_candidates: Vec<InfeasibleCandidate>,
}

impl RunLog {
    pub fn skip_symbol(&mut self, symbol: &str, reason: impl Into<String>) {
        self.skipped_symbols.push(SkippedSymbol {
            symbol: symbol.to_string(),
            reason: reason.into(),
        });
    }

    /// Drops clustering entries left by an earlier run of the cluster stage.
    pub fn clear_cluster_stage(&mut self) {
        self.excluded_rows.clear();
        self.infeasible_candidates.clear();
    }

    /// Appends another log's entries; used when merging per-stage logs.
    pub fn merge(&mut self, other: RunLog) {
        self.symbols_requested += other.symbols_requested;
        self.symbols_processed += other.symbols_processed;
        self.records_emitted += other.records_emitted;
        self.skipped_symbols.extend(other.skipped_symbols);
        self.insufficient_months.extend(other.insufficient_months);
        self.duplicate_timestamps.extend(other.duplicate_timestamps);
        self.excluded_rows.extend(other.excluded_rows);
        self.infeasible_candidates.extend(other.infeasible_candidates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_accumulates() {
        let mut a = RunLog {
            symbols_requested: 2,
            ..Default::default()
        };
        a.skip_symbol("AUSDT", "missing file");

        let mut b = RunLog {
            symbols_requested: 1,
            records_emitted: 4,
            ..Default::default()
        };
        b.skip_symbol("BUSDT", "bad schema");

        a.merge(b);
        assert_eq!(a.symbols_requested, 3);
        assert_eq!(a.records_emitted, 4);
        assert_eq!(a.skipped_symbols.len(), 2);
        assert_eq!(a.skipped_symbols[1].symbol, "BUSDT");
    }

    #[test]
    fn test_rerun_of_cluster_stage_replaces_its_entries() {
        let stage = || RunLog {
            excluded_rows: vec![ExcludedRow {
                symbol: "XUSDT".to_string(),
                month: "2024-01".to_string(),
                non_finite: vec!["return_skew".to_string()],
            }],
            infeasible_candidates: vec![InfeasibleCandidate {
                k: 9,
                reason: "too few rows".to_string(),
            }],
            ..Default::default()
        };
        let mut log = RunLog {
            records_emitted: 5,
            ..Default::default()
        };
        log.merge(stage());

        log.clear_cluster_stage();
        log.merge(stage());
        assert_eq!(log.records_emitted, 5);
        assert_eq!(log.excluded_rows.len(), 1);
        assert_eq!(log.infeasible_candidates.len(), 1);
    }

    #[test]
    fn test_serializes_to_json() {
        let mut log = RunLog::default();
        log.insufficient_months.push(InsufficientMonth {
            symbol: "XUSDT".to_string(),
            month: "2024-02".to_string(),
            bars: 12,
        });
        let json = serde_json::to_string(&log).unwrap();
        assert!(json.contains("\"insufficient_months\""));
        assert!(json.contains("2024-02"));
    }
}
