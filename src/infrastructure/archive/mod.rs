pub mod csv_directory;
pub mod scanner;

pub use csv_directory::CsvDirectoryArchive;
pub use scanner::{ScanReport, SymbolMetadata, scan_archive};
