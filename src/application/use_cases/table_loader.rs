// ============================================================
// TABLE LOADER USE CASE
// ============================================================
// Dispatch raw input to the right decoder and produce a Table

use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use tracing::{error, info};

use crate::domain::error::{AppError, Result};
use crate::domain::table::{FileFormat, LoaderSettings, RawInput, Table};
use crate::infrastructure::tabular::{EncodingResolver, HeaderLocator};

/// Output of a successful load
#[derive(Debug)]
pub struct LoadedTable {
    pub table: Table,
    pub format: FileFormat,
    /// Decoder description, e.g. "CSV (UTF-8)" or "Excel (xlsx)"
    pub engine_used: String,
    /// Physical header row for spreadsheets, `None` for delimited text
    pub header_row_index: Option<usize>,
}

pub struct TableLoader {
    resolver: EncodingResolver,
    locator: HeaderLocator,
}

impl Default for TableLoader {
    fn default() -> Self {
        Self::new(&LoaderSettings::default())
    }
}

impl TableLoader {
    pub fn new(settings: &LoaderSettings) -> Self {
        Self {
            resolver: EncodingResolver::new(settings.encoding_sample_bytes),
            locator: HeaderLocator::new(settings.header_scan_rows),
        }
    }

    /// Load in-memory input. The input is consumed.
    pub fn load(&self, input: RawInput) -> Result<LoadedTable> {
        let format = FileFormat::classify(input.filename())?;
        if input.is_empty() {
            return Err(AppError::EmptyInput);
        }

        let start = Instant::now();
        let loaded = match format {
            FileFormat::DelimitedText => self.load_delimited(input.bytes()),
            _ => self.load_spreadsheet(format, || {
                self.locator.locate(Cursor::new(input.into_bytes()), format)
            }),
        };
        finish(loaded, format, start)
    }

    /// Load a file already persisted to temporary storage.
    pub fn load_path(&self, path: &Path, filename: &str) -> Result<LoadedTable> {
        let format = FileFormat::classify(filename)?;
        let size = std::fs::metadata(path)?.len();
        if size == 0 {
            return Err(AppError::EmptyInput);
        }

        let start = Instant::now();
        let loaded = match format {
            FileFormat::DelimitedText => {
                let bytes = std::fs::read(path)?;
                self.load_delimited(&bytes)
            }
            _ => self.load_spreadsheet(format, || self.locator.locate_path(path, format)),
        };
        finish(loaded, format, start)
    }

    fn load_delimited(&self, bytes: &[u8]) -> Result<LoadedTable> {
        info!("Detecting CSV encoding...");
        let (table, encoding) = self.resolver.resolve(bytes)?;
        Ok(LoadedTable {
            table,
            format: FileFormat::DelimitedText,
            engine_used: format!("CSV ({})", encoding),
            header_row_index: None,
        })
    }

    fn load_spreadsheet(
        &self,
        format: FileFormat,
        locate: impl FnOnce() -> Result<(usize, Table)>,
    ) -> Result<LoadedTable> {
        info!(engine = format.decoder_label(), "Reading workbook");
        let (header_row_index, table) = locate()?;
        Ok(LoadedTable {
            table,
            format,
            engine_used: format.decoder_label().to_string(),
            header_row_index: Some(header_row_index),
        })
    }
}

/// Log the outcome and fold decoder-specific errors into `LoadFailure`.
fn finish(loaded: Result<LoadedTable>, format: FileFormat, start: Instant) -> Result<LoadedTable> {
    match loaded {
        Ok(loaded) => {
            info!(
                rows = loaded.table.row_count(),
                columns = loaded.table.column_count(),
                engine = %loaded.engine_used,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Loaded table"
            );
            Ok(loaded)
        }
        Err(e) => {
            error!(format = format.decoder_label(), error = %e, "Failed to load file");
            Err(match e {
                AppError::UnsupportedFormat(_)
                | AppError::UndecodableInput(_)
                | AppError::LoadFailure { .. }
                | AppError::EmptyInput => e,
                other => AppError::load_failure(format.decoder_label(), other),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_load_csv() {
        let loaded = TableLoader::default()
            .load(RawInput::new(b"a,b\n1,2\n".to_vec(), "data.CSV"))
            .unwrap();

        assert_eq!(loaded.format, FileFormat::DelimitedText);
        assert!(loaded.engine_used.starts_with("CSV ("));
        assert_eq!(loaded.header_row_index, None);
        assert_eq!(loaded.table.row_count(), 1);
    }

    #[test]
    fn test_load_xlsx_skips_preamble() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(3, 0, "Name").unwrap();
        sheet.write_string(4, 0, "Alice").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let loaded = TableLoader::default()
            .load(RawInput::new(bytes, "export.xlsx"))
            .unwrap();

        assert_eq!(loaded.header_row_index, Some(3));
        assert_eq!(loaded.engine_used, "Excel (xlsx)");
        assert_eq!(loaded.table.columns(), ["Name"]);
    }

    #[test]
    fn test_unsupported_format() {
        let err = TableLoader::default()
            .load(RawInput::new(b"x".to_vec(), "file.json"))
            .unwrap_err();
        assert_eq!(err.kind(), "unsupported_format");
    }

    #[test]
    fn test_empty_input() {
        let err = TableLoader::default()
            .load(RawInput::new(Vec::new(), "file.csv"))
            .unwrap_err();
        assert_eq!(err, AppError::EmptyInput);
    }

    #[test]
    fn test_mislabelled_content_is_load_failure() {
        let err = TableLoader::default()
            .load(RawInput::new(b"a,b\n1,2\n".to_vec(), "really_csv.xls"))
            .unwrap_err();

        match err {
            AppError::LoadFailure { format, cause } => {
                assert_eq!(format, "Excel (xls)");
                assert!(!cause.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_path_reads_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.bin");
        std::fs::write(&path, "x;y\n1;2\n3;4\n").unwrap();

        let loaded = TableLoader::default().load_path(&path, "input.csv").unwrap();
        assert_eq!(loaded.table.columns(), ["x", "y"]);
        assert_eq!(loaded.table.row_count(), 2);
    }

    #[test]
    fn test_rows_match_column_count() {
        let loaded = TableLoader::default()
            .load(RawInput::new(b"a,b,c\n1\n1,2\n1,2,3\n".to_vec(), "f.csv"))
            .unwrap();

        let width = loaded.table.column_count();
        assert!(loaded.table.rows().iter().all(|row| row.len() == width));
    }
}
