use std::fmt;

use crate::domain::errors::SeriesError;

/// One cell of a raw table, parsed once when the table is read.
///
/// Empty cells and `nan`/`null` markers read as `Number(NaN)`. Anything that
/// does not parse as a number (a date-time string, a typo) stays as text.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("nan") || value.eq_ignore_ascii_case("null")
        {
            return Cell::Number(f64::NAN);
        }
        match value.parse::<f64>() {
            Ok(number) => Cell::Number(number),
            Err(_) => Cell::Text(value.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(number) => Some(*number),
            Cell::Text(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(number) => write!(f, "{}", number),
            Cell::Text(text) => f.write_str(text),
        }
    }
}

/// Per-symbol table as read from the archive.
///
/// The index is kept as text until the normalizer parses it as the time
/// axis. Regular columns are parsed into [`Cell`]s on read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Header of the index column, possibly empty.
    pub index_name: String,
    pub index: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Builds a table, checking that every row matches the header width.
    pub fn new(
        index_name: impl Into<String>,
        columns: Vec<String>,
        index: Vec<String>,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self, SeriesError> {
        if let Some((row, found)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
            .map(|(i, r)| (i, r.len()))
        {
            return Err(SeriesError::RaggedRow {
                row,
                expected: columns.len(),
                found,
            });
        }
        if index.len() != rows.len() {
            return Err(SeriesError::RaggedRow {
                row: index.len().min(rows.len()),
                expected: rows.len(),
                found: index.len(),
            });
        }
        Ok(Self {
            index_name: index_name.into(),
            index,
            columns,
            rows,
        })
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    /// Position of the first column with this name.
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_unique_columns(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.columns.iter().all(|c| seen.insert(c.as_str()))
    }

    /// Moves the index into the first column and replaces it with row numbers.
    pub fn reset_index(&self) -> RawTable {
        let index_column = if self.index_name.is_empty() {
            "index".to_string()
        } else {
            self.index_name.clone()
        };
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(index_column);
        columns.extend(self.columns.iter().cloned());

        let rows = self
            .index
            .iter()
            .zip(&self.rows)
            .map(|(idx, row)| {
                let mut out = Vec::with_capacity(row.len() + 1);
                out.push(Cell::parse(idx));
                out.extend(row.iter().cloned());
                out
            })
            .collect();

        RawTable {
            index_name: String::new(),
            index: (0..self.rows.len()).map(|i| i.to_string()).collect(),
            columns,
            rows,
        }
    }
}
