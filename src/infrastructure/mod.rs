// Per-symbol archive access and stage-1 scan
pub mod archive;

// Flat-file outputs
pub mod persistence;
