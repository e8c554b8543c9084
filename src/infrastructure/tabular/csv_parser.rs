// ============================================================
// CSV PARSER
// ============================================================
// Parse decoded delimited text into a Table

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::domain::error::AppError;
use crate::domain::table::{is_na_token, Cell, Table};

/// Comma-separated parser. Every field is kept as text.
#[derive(Default)]
pub struct CsvParser;

impl CsvParser {
    /// Fields are always split on this byte.
    pub const DELIMITER: u8 = b',';

    pub fn new() -> Self {
        Self
    }

    /// Parse CSV content. The first non-blank line is the header.
    ///
    /// Blank lines are skipped, rows wider than the header are dropped,
    /// narrower rows are padded with missing cells. Fails only when no
    /// header can be read.
    pub fn parse_content(&self, content: &str) -> Result<Table, AppError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(Self::DELIMITER)
            .has_headers(false)
            .trim(Trim::None)
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        let mut records = reader.records();

        let headers = loop {
            match records.next() {
                Some(Ok(record)) if is_blank_line(&record) => continue,
                Some(Ok(record)) => break record,
                Some(Err(e)) => {
                    return Err(AppError::ParseError(format!(
                        "Failed to read CSV headers: {}",
                        e
                    )))
                }
                None => {
                    return Err(AppError::ParseError(
                        "No columns to parse from file".to_string(),
                    ))
                }
            }
        };

        let columns = header_names(&headers);
        let width = columns.len();
        let mut table = Table::new(columns);
        let mut skipped = 0usize;

        for (index, result) in records.enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!(line = index + 2, error = %e, "Skipping malformed CSV row");
                    skipped += 1;
                    continue;
                }
            };

            if is_blank_line(&record) {
                continue;
            }

            if record.len() > width {
                debug!(
                    line = index + 2,
                    expected = width,
                    found = record.len(),
                    "Skipping CSV row with too many fields"
                );
                skipped += 1;
                continue;
            }

            table.push_row(record.iter().map(parse_field).collect());
        }

        if skipped > 0 {
            debug!(skipped, "Skipped malformed CSV rows");
        }

        Ok(table)
    }
}

fn is_blank_line(record: &StringRecord) -> bool {
    record.len() == 0 || (record.len() == 1 && record.get(0).map_or(true, str::is_empty))
}

fn header_names(record: &StringRecord) -> Vec<String> {
    record
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            if name.is_empty() {
                format!("Unnamed: {}", idx)
            } else {
                name.to_string()
            }
        })
        .collect()
}

fn parse_field(value: &str) -> Cell {
    if is_na_token(value) {
        None
    } else {
        Some(value.to_string())
    }
}
