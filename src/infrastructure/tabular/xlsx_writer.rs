// ============================================================
// XLSX WRITER
// ============================================================
// Serialize a Table into a single-sheet workbook

use rust_xlsxwriter::{Workbook, XlsxError};
use tracing::warn;

use crate::domain::error::AppError;
use crate::domain::table::Table;

pub const SHEET_NAME: &str = "Cleaned Data";

/// Excel's hard column limit
const MAX_COLUMNS: usize = 16_384;
/// Excel's hard row limit, header included
const MAX_ROWS: usize = 1_048_576;
/// Excel's per-cell string limit, in characters
const MAX_STRING_CHARS: usize = 32_767;

/// Encode `table` as xlsx bytes. Header goes on row 0, missing cells
/// are left unwritten. Text longer than Excel allows is truncated.
pub fn write_xlsx(table: &Table) -> Result<Vec<u8>, AppError> {
    if table.column_count() > MAX_COLUMNS {
        return Err(AppError::ValidationError(format!(
            "Table has {} columns, xlsx supports at most {}",
            table.column_count(),
            MAX_COLUMNS
        )));
    }
    if table.row_count() + 1 > MAX_ROWS {
        return Err(AppError::ValidationError(format!(
            "Table has {} rows, xlsx supports at most {}",
            table.row_count(),
            MAX_ROWS - 1
        )));
    }

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).map_err(xlsx_err)?;

    for (col, name) in table.columns().iter().enumerate() {
        sheet
            .write_string(0, col as u16, fit_cell(name, 0, col))
            .map_err(xlsx_err)?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        let excel_row = (row_idx + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            if let Some(value) = value {
                sheet
                    .write_string(excel_row, col as u16, fit_cell(value, excel_row, col))
                    .map_err(xlsx_err)?;
            }
        }
    }

    workbook.save_to_buffer().map_err(xlsx_err)
}

fn fit_cell(value: &str, row: u32, col: usize) -> &str {
    match value.char_indices().nth(MAX_STRING_CHARS) {
        Some((cut, _)) => {
            warn!(
                row,
                col,
                len = value.chars().count(),
                "Truncated cell to Excel's string limit"
            );
            &value[..cut]
        }
        None => value,
    }
}

fn xlsx_err(err: XlsxError) -> AppError {
    AppError::Internal(format!("Failed to write xlsx: {}", err))
}
