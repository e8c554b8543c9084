// ============================================================
// TABLE
// ============================================================
// Ordered columns plus ordered rows of text cells

use serde::{Deserialize, Serialize};

/// A cell is either text or the missing marker.
///
/// Every ingestion path coerces values to text, so numbers and dates
/// never appear here as typed values.
pub type Cell = Option<String>;

/// Text values read as the missing marker at ingestion.
///
/// Matched exactly, without trimming. Header cells are never converted.
pub const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_na_token(value: &str) -> bool {
    NA_TOKENS.contains(&value)
}

/// Map NA tokens to missing, keep everything else.
pub fn na_to_missing(cell: Cell) -> Cell {
    cell.filter(|value| !is_na_token(value))
}

/// True when every cell in the row is missing.
pub fn is_missing_row(row: &[Cell]) -> bool {
    row.iter().all(Option::is_none)
}

/// In-memory tabular value handed from the loader to the cleaner.
///
/// Invariant: every row holds exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create an empty table with the given header
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from rows, normalising each row to the header width
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let mut table = Self::new(columns);
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Append a row. Short rows are right-padded with missing cells,
    /// long rows are truncated to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First `n` rows as a new table with the same header
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Cell>>) {
        (self.columns, self.rows)
    }
}
