// ============================================================
// HEADER LOCATOR
// ============================================================
// Skip blank preamble rows in a worksheet and use the first
// non-blank row as the header

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use calamine::{Data, DataType, Range, Reader, Xls, Xlsb, Xlsx};
use tracing::{debug, info};

use crate::domain::error::AppError;
use crate::domain::table::{is_na_token, na_to_missing, Cell, FileFormat, Table};

pub struct HeaderLocator {
    scan_rows: usize,
}

impl Default for HeaderLocator {
    fn default() -> Self {
        Self { scan_rows: 100 }
    }
}

impl HeaderLocator {
    pub fn new(scan_rows: usize) -> Self {
        Self {
            scan_rows: scan_rows.max(1),
        }
    }

    /// Open the workbook at `path` and locate its header row.
    pub fn locate_path(&self, path: &Path, format: FileFormat) -> Result<(usize, Table), AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::load_failure(
                format.decoder_label(),
                format!("Failed to open {}: {}", path.display(), e),
            )
        })?;
        self.locate(BufReader::new(file), format)
    }

    /// Read the first worksheet from `source` and return the physical
    /// index of the header row together with the table below it.
    pub fn locate<RS>(&self, source: RS, format: FileFormat) -> Result<(usize, Table), AppError>
    where
        RS: Read + Seek,
    {
        let label = format.decoder_label();
        let range = match format {
            FileFormat::SpreadsheetOpenXml => first_sheet::<_, RS, _>(Xlsx::new(source), label)?,
            FileFormat::SpreadsheetLegacyBinary => first_sheet::<_, RS, _>(Xls::new(source), label)?,
            FileFormat::SpreadsheetBinaryInterchange => first_sheet::<_, RS, _>(Xlsb::new(source), label)?,
            FileFormat::DelimitedText => {
                return Err(AppError::load_failure(
                    label,
                    "delimited text has no worksheet header to locate",
                ))
            }
        };

        let rows = physical_rows(&range);
        let header_index = self.count_blank_prefix(&rows);
        if header_index > 0 {
            info!(skipped = header_index, "Skipping blank rows at top");
        }

        let table = build_table(rows, header_index);
        debug!(
            header_index,
            rows = table.row_count(),
            columns = table.column_count(),
            "Located spreadsheet header"
        );
        Ok((header_index, table))
    }

    /// Leading blank rows within the scan window
    fn count_blank_prefix(&self, rows: &[Vec<Cell>]) -> usize {
        rows.iter()
            .take(self.scan_rows)
            .take_while(|row| is_blank_row(row))
            .count()
    }
}

fn first_sheet<R, RS, E>(
    workbook: Result<R, E>,
    label: &str,
) -> Result<Range<Data>, AppError>
where
    R: Reader<RS, Error = E>,
    RS: Read + Seek,
    E: std::fmt::Display,
{
    let mut workbook =
        workbook.map_err(|e| AppError::load_failure(label, format!("Failed to open workbook: {}", e)))?;

    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::load_failure(label, "No worksheet found"))?
        .map_err(|e| AppError::load_failure(label, format!("Failed to read worksheet: {}", e)))
}

/// Rows and columns indexed from cell A1.
///
/// `calamine` ranges begin at the first used cell, so rows above and
/// columns left of the range start are restored as missing cells.
fn physical_rows(range: &Range<Data>) -> Vec<Vec<Cell>> {
    let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
    let col_offset = col_offset as usize;
    let width = col_offset + range.width();

    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(row_offset as usize + range.height());
    for _ in 0..row_offset {
        rows.push(vec![None; width]);
    }
    for row in range.rows() {
        let mut cells: Vec<Cell> = Vec::with_capacity(width);
        cells.resize(col_offset, None);
        cells.extend(row.iter().map(cell_to_text));
        rows.push(cells);
    }
    rows
}

fn build_table(rows: Vec<Vec<Cell>>, header_index: usize) -> Table {
    let mut rows = rows.into_iter().skip(header_index);
    let Some(header) = rows.next() else {
        return Table::default();
    };

    let columns = header
        .into_iter()
        .enumerate()
        .map(|(idx, name)| name.unwrap_or_else(|| format!("Unnamed: {}", idx)))
        .collect();

    let mut table = Table::new(columns);
    for row in rows {
        table.push_row(row.into_iter().map(na_to_missing).collect());
    }
    table
}

/// Blank means every cell is missing, an NA token or whitespace-only.
fn is_blank_row(row: &[Cell]) -> bool {
    row.iter().all(|cell| {
        cell.as_deref()
            .map_or(true, |s| is_na_token(s) || s.trim().is_empty())
    })
}

/// Coerce a worksheet value to text.
pub fn cell_to_text(cell: &Data) -> Cell {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format_float(*f)),
        Data::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .or_else(|| Some(cell.to_string())),
        other => Some(other.to_string()),
    }
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
