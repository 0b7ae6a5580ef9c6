use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::market::raw_table::{Cell, RawTable};
use crate::domain::ports::ArchiveSource;

const TABLE_EXTENSION: &str = "csv";
const INTERVAL_SUFFIX: &str = "_1m";

/// A directory holding one minute-bar CSV per symbol.
///
/// The first CSV column is the table index; its header is the index name.
pub struct CsvDirectoryArchive {
    root: PathBuf,
    files: BTreeMap<String, PathBuf>,
}

impl CsvDirectoryArchive {
    /// Lists the directory; files are only read on [`ArchiveSource::load`].
    pub fn open(root: &Path) -> Result<Self> {
        let entries = fs::read_dir(root)
            .with_context(|| format!("Failed to list archive directory {}", root.display()))?;

        let mut files = BTreeMap::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("Failed to read entry in {}", root.display()))?
                .path();
            let is_table = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(TABLE_EXTENSION));
            if !path.is_file() || !is_table {
                continue;
            }
            if let Some(symbol) = symbol_from_path(&path) {
                if let Some(previous) = files.insert(symbol.clone(), path.clone()) {
                    debug!(
                        "{} maps to both {} and {}, keeping the latter",
                        symbol,
                        previous.display(),
                        path.display()
                    );
                }
            }
        }
        debug!("Archive {}: {} symbol files", root.display(), files.len());

        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, symbol: &str) -> Option<&Path> {
        self.files.get(symbol).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ArchiveSource for CsvDirectoryArchive {
    fn symbols(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn load(&self, symbol: &str) -> Result<RawTable> {
        let path = self
            .path_of(symbol)
            .with_context(|| format!("No table for {} in {}", symbol, self.root.display()))?;
        read_table(path)
    }
}

/// `btcusdt_1m.csv` -> `BTCUSDT`
pub fn symbol_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let stem = match stem.len().checked_sub(INTERVAL_SUFFIX.len()) {
        Some(cut)
            if stem.is_char_boundary(cut)
                && stem[cut..].eq_ignore_ascii_case(INTERVAL_SUFFIX) =>
        {
            &stem[..cut]
        }
        _ => stem,
    };
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_uppercase())
}

/// Reads a whole table; the first column becomes the index. Other fields
/// are parsed into cells as they are read.
pub fn read_table(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();
    let Some(index_name) = headers.get(0) else {
        bail!("{} has no header", path.display());
    };
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut index = Vec::new();
    let mut rows = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Failed to read row {} of {}", row, path.display()))?;
        let mut fields = record.iter();
        index.push(fields.next().unwrap_or_default().to_string());
        rows.push(fields.map(Cell::parse).collect());
    }

    RawTable::new(index_name, columns, index, rows)
        .with_context(|| format!("Malformed table {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(dir: &Path, name: &str, body: &str) {
        let mut file = fs::File::create(dir.join(name)).unwrap();
        file.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn test_symbol_from_path() {
        assert_eq!(
            symbol_from_path(Path::new("/a/btcusdt_1m.csv")),
            Some("BTCUSDT".to_string())
        );
        assert_eq!(
            symbol_from_path(Path::new("ETHUSDT.csv")),
            Some("ETHUSDT".to_string())
        );
        assert_eq!(symbol_from_path(Path::new("_1m.csv")), None);
    }

    #[test]
    fn test_open_lists_only_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "BTCUSDT_1m.csv", "open_time,close\n");
        write(dir.path(), "notes.txt", "ignored");
        write(dir.path(), "ethusdt.CSV", "open_time,close\n");

        let archive = CsvDirectoryArchive::open(dir.path()).unwrap();
        assert_eq!(archive.symbols(), vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn test_first_column_is_index() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "XUSDT_1m.csv",
            "open_time,open,close\n2024-01-01 00:00:00,1.0,1.5\n2024-01-01 00:01:00,1.5,2.0\n",
        );

        let table = CsvDirectoryArchive::open(dir.path())
            .unwrap()
            .load("XUSDT")
            .unwrap();
        assert_eq!(table.index_name, "open_time");
        assert_eq!(table.columns, vec!["open", "close"]);
        assert_eq!(table.index[1], "2024-01-01 00:01:00");
        assert_eq!(table.rows[1], vec![Cell::Number(1.5), Cell::Number(2.0)]);
    }

    #[test]
    fn test_cells_are_parsed_on_read() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "XUSDT.csv",
            ",open_time,close,volume
0,1704067200000,1.5,
1,1704067260000,oops,7
",
        );

        let table = read_table(&dir.path().join("XUSDT.csv")).unwrap();
        assert_eq!(table.index_name, "");
        assert_eq!(table.rows[0][0], Cell::Number(1_704_067_200_000.0));
        assert!(table.rows[0][2].as_number().unwrap().is_nan());
        assert_eq!(table.rows[1][1], Cell::Text("oops".to_string()));
        assert_eq!(table.rows[1][2], Cell::Number(7.0));
    }

    #[test]
    fn test_ragged_row_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "XUSDT.csv", "open_time,open,close\n1,2,3\n4,5\n");

        let err = read_table(&dir.path().join("XUSDT.csv")).unwrap_err();
        assert!(format!("{:#}", err).contains("Row 1"));
    }

    #[test]
    fn test_unknown_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let archive = CsvDirectoryArchive::open(dir.path()).unwrap();
        assert!(archive.is_empty());
        assert!(archive.load("NOPEUSDT").is_err());
    }
}
