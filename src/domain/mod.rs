// Minute bars, raw tables and the symbol universe
pub mod market;

// Monthly feature records
pub mod features;

// Cluster assignments
pub mod clustering;

// Port interfaces
pub mod ports;

// What each run left out
pub mod run_log;

// Domain-specific error types
pub mod errors;
