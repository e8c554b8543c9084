// ============================================================
// DATA CLEANER USE CASE
// ============================================================
// Fixed cleaning pipeline: dedup, drop blank rows, rename
// columns, trim cells

use std::collections::HashSet;
use std::time::Instant;

use tracing::info;

use crate::domain::table::{is_missing_row, Cell, CleaningStats, Table};

/// Appended to every column name. Applied on every call, so cleaning an
/// already-cleaned table suffixes twice.
pub const COLUMN_SUFFIX: &str = "_CHANGED";

/// Stateless cleaner. Each call returns its own stats.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataCleaner;

impl DataCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Run every stage in order. Never fails.
    pub fn clean(&self, table: Table) -> (Table, CleaningStats) {
        let start = Instant::now();
        let (columns, rows) = table.into_parts();

        let mut stats = CleaningStats {
            original_rows: rows.len(),
            columns_count: columns.len(),
            ..Default::default()
        };
        info!(
            rows = stats.original_rows,
            columns = stats.columns_count,
            "Cleaning data"
        );

        let before = rows.len();
        let rows = remove_duplicates(rows);
        stats.duplicates_removed = before - rows.len();
        info!(removed = stats.duplicates_removed, "Removed duplicate rows");

        let before = rows.len();
        let rows = remove_empty_rows(rows);
        stats.empty_rows_removed = before - rows.len();
        info!(removed = stats.empty_rows_removed, "Removed empty rows");

        let columns = clean_column_names(columns);
        let rows = clean_cell_values(rows);

        stats.final_rows = rows.len();
        info!(
            final_rows = stats.final_rows,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Cleaning complete"
        );

        (Table::from_rows(columns, rows), stats)
    }
}

/// Keep the first occurrence of each distinct row, preserving order.
fn remove_duplicates(rows: Vec<Vec<Cell>>) -> Vec<Vec<Cell>> {
    let keep: Vec<bool> = {
        let mut seen: HashSet<&[Cell]> = HashSet::with_capacity(rows.len());
        rows.iter().map(|row| seen.insert(row.as_slice())).collect()
    };

    rows.into_iter()
        .zip(keep)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect()
}

/// Drop rows where every cell is missing. Rows of empty strings stay.
fn remove_empty_rows(rows: Vec<Vec<Cell>>) -> Vec<Vec<Cell>> {
    rows.into_iter().filter(|row| !is_missing_row(row)).collect()
}

fn clean_column_names(columns: Vec<String>) -> Vec<String> {
    columns
        .into_iter()
        .map(|name| format!("{}{}", name.trim(), COLUMN_SUFFIX))
        .collect()
}

fn clean_cell_values(rows: Vec<Vec<Cell>>) -> Vec<Vec<Cell>> {
    rows.into_iter()
        .map(|row| row.into_iter().map(trim_cell).collect())
        .collect()
}

fn trim_cell(cell: Cell) -> Cell {
    cell.map(|value| {
        let trimmed = value.trim();
        if trimmed.len() == value.len() {
            value
        } else {
            trimmed.to_string()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(value: &str) -> Cell {
        Some(value.to_string())
    }

    fn row(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| cell(v)).collect()
    }

    #[test]
    fn test_dedup_preserves_first_occurrence_order() {
        let a = row(&["a"]);
        let b = row(&["b"]);
        let c = row(&["c"]);
        let table = Table::from_rows(
            vec!["x".into()],
            vec![a.clone(), b.clone(), a.clone(), c.clone()],
        );

        let (cleaned, stats) = DataCleaner::new().clean(table);

        assert_eq!(cleaned.rows(), [a, b, c]);
        assert_eq!(stats.duplicates_removed, 1);
    }

    #[test]
    fn test_missing_rows_dropped_but_empty_strings_kept() {
        let table = Table::from_rows(
            vec!["x".into(), "y".into()],
            vec![vec![None, None], row(&["", ""])],
        );

        let (cleaned, stats) = DataCleaner::new().clean(table);

        assert_eq!(stats.empty_rows_removed, 1);
        assert_eq!(cleaned.rows(), [row(&["", ""])]);
    }

    #[test]
    fn test_duplicate_missing_rows_count_as_duplicates_first() {
        let table = Table::from_rows(
            vec!["x".into()],
            vec![vec![None], vec![None], row(&["v"])],
        );

        let (_, stats) = DataCleaner::new().clean(table);

        assert_eq!(stats.duplicates_removed, 1);
        assert_eq!(stats.empty_rows_removed, 1);
        assert_eq!(stats.final_rows, 1);
    }

    #[test]
    fn test_rename_trims_and_suffixes() {
        let table = Table::new(vec![" Name ".into(), "Age".into(), "Age".into()]);

        let (cleaned, _) = DataCleaner::new().clean(table);

        assert_eq!(
            cleaned.columns(),
            ["Name_CHANGED", "Age_CHANGED", "Age_CHANGED"]
        );
    }

    #[test]
    fn test_trim_cells_leaves_missing_alone() {
        let table = Table::from_rows(
            vec!["x".into(), "y".into()],
            vec![vec![cell("  padded\t"), None]],
        );

        let (cleaned, _) = DataCleaner::new().clean(table);

        assert_eq!(cleaned.rows()[0], vec![cell("padded"), None]);
    }

    #[test]
    fn test_trim_runs_after_dedup() {
        // Rows differing only in whitespace are distinct at dedup time.
        let table = Table::from_rows(
            vec!["x".into()],
            vec![row(&["a "]), row(&["a"])],
        );

        let (cleaned, stats) = DataCleaner::new().clean(table);

        assert_eq!(stats.duplicates_removed, 0);
        assert_eq!(cleaned.rows(), [row(&["a"]), row(&["a"])]);
    }

    #[test]
    fn test_clean_twice_suffixes_twice() {
        let table = Table::from_rows(vec!["Name".into()], vec![row(&["x"])]);

        let (once, _) = DataCleaner::new().clean(table);
        let (twice, stats) = DataCleaner::new().clean(once.clone());

        assert_eq!(twice.columns(), ["Name_CHANGED_CHANGED"]);
        assert_eq!(twice.rows(), once.rows());
        assert_eq!(stats.duplicates_removed, 0);
        assert_eq!(stats.empty_rows_removed, 0);
    }

    #[test]
    fn test_empty_table() {
        let (cleaned, stats) = DataCleaner::new().clean(Table::default());

        assert!(cleaned.is_empty());
        assert_eq!(stats, CleaningStats::default());
    }

    #[test]
    fn test_stats_summary() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![
                row(&["1", "2"]),
                row(&["1", "2"]),
                vec![None, None],
                row(&["3", "4"]),
            ],
        );

        let (_, stats) = DataCleaner::new().clean(table);

        assert_eq!(
            stats,
            CleaningStats {
                original_rows: 4,
                duplicates_removed: 1,
                empty_rows_removed: 1,
                final_rows: 2,
                columns_count: 2,
            }
        );
    }
}
