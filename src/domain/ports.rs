use crate::domain::market::raw_table::RawTable;
use anyhow::Result;

/// Read access to a per-symbol trading archive.
///
/// Implementations materialize one symbol's table per `load` call so callers
/// can keep memory bounded to the symbols currently being processed.
pub trait ArchiveSource: Send + Sync {
    /// Symbols available in the archive, sorted.
    fn symbols(&self) -> Vec<String>;

    /// Raw table of one symbol.
    fn load(&self, symbol: &str) -> Result<RawTable>;
}
