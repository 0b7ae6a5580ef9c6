// Raw table -> canonical minute series
pub mod normalizer;

// One symbol-month -> one feature record
pub mod extractor;

// Whole universe -> feature table
pub mod aggregator;
