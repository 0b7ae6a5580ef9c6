use thiserror::Error;

/// Errors raised while turning a raw per-symbol table into a minute series
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("No recognizable time column (looked for {candidates:?})")]
    MissingTimeColumn { candidates: Vec<String> },

    #[error("Required column missing: {column}")]
    MissingColumn { column: String },

    #[error("Unparseable timestamp at row {row}: '{value}'")]
    UnparseableTimestamp { row: usize, value: String },

    #[error("Unparseable number in column {column} at row {row}: '{value}'")]
    UnparseableNumber {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Row {row} has {found} fields, header declares {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Errors related to feature standardization
#[derive(Debug, Error)]
pub enum StandardizeError {
    #[error("Cannot standardize an empty feature matrix")]
    EmptyMatrix,

    #[error("Zero-variance feature column(s): {columns:?}")]
    ZeroVariance { columns: Vec<String> },

    #[error("Non-finite value in column {column} at row {row}")]
    NonFiniteValue { column: String, row: usize },

    #[error("Column count mismatch: scaler fitted on {expected}, got {found}")]
    ShapeMismatch { expected: usize, found: usize },
}

/// Errors related to cluster fitting and model selection
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Invalid candidate range: k_min {k_min} > k_max {k_max}")]
    InvalidRange { k_min: usize, k_max: usize },

    #[error("Too few rows for k = {k}: {rows} row(s)")]
    TooFewRows { k: usize, rows: usize },

    #[error("Only {distinct} distinct point(s), cannot form k = {k} clusters")]
    TooFewDistinctPoints { k: usize, distinct: usize },

    #[error("All {rows} rows are identical, clustering is meaningless")]
    DegenerateMatrix { rows: usize },

    #[error("No feasible k in [{k_min}, {k_max}] for {rows} row(s)")]
    NoFeasibleCandidate {
        k_min: usize,
        k_max: usize,
        rows: usize,
    },
}
