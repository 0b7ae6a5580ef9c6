// Monthly feature records and the table they are collected into
pub mod record;

// Descriptive statistics behind the feature formulas
pub mod stats;

pub use record::{FEATURE_COUNT, FEATURE_NAMES, FeatureRecord, FeatureTable};
