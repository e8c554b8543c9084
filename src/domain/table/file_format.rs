// ============================================================
// FILE FORMAT
// ============================================================
// Suffix-based classification of incoming files

use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, Result};

/// Supported input container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileFormat {
    /// `.csv`
    DelimitedText,
    /// `.xlsx`
    SpreadsheetOpenXml,
    /// `.xls`
    SpreadsheetLegacyBinary,
    /// `.xlsb`
    SpreadsheetBinaryInterchange,
}

impl FileFormat {
    pub const CSV_EXTENSIONS: &'static [&'static str] = &[".csv"];
    pub const EXCEL_EXTENSIONS: &'static [&'static str] = &[".xlsx", ".xls", ".xlsb"];

    /// Classify a filename by its suffix (case-insensitive).
    ///
    /// Content is not inspected; a mislabelled file surfaces later as a
    /// load failure.
    pub fn classify(filename: &str) -> Result<Self> {
        let lower = filename.trim().to_lowercase();

        // ".xlsb" and ".xlsx" do not end with ".xls", so plain suffix
        // matching is unambiguous.
        let format = if lower.ends_with(".csv") {
            FileFormat::DelimitedText
        } else if lower.ends_with(".xlsx") {
            FileFormat::SpreadsheetOpenXml
        } else if lower.ends_with(".xls") {
            FileFormat::SpreadsheetLegacyBinary
        } else if lower.ends_with(".xlsb") {
            FileFormat::SpreadsheetBinaryInterchange
        } else {
            return Err(AppError::UnsupportedFormat(format!(
                "Invalid file type for '{}'. Must be one of: {}",
                filename,
                Self::supported_extensions().join(", ")
            )));
        };

        Ok(format)
    }

    pub fn supported_extensions() -> Vec<&'static str> {
        Self::CSV_EXTENSIONS
            .iter()
            .chain(Self::EXCEL_EXTENSIONS.iter())
            .copied()
            .collect()
    }

    pub fn is_spreadsheet(&self) -> bool {
        !matches!(self, FileFormat::DelimitedText)
    }

    /// Coarse family name: "CSV" or "Excel"
    pub fn family(&self) -> &'static str {
        if self.is_spreadsheet() {
            "Excel"
        } else {
            "CSV"
        }
    }

    /// Label of the decoder used for this format
    pub fn decoder_label(&self) -> &'static str {
        match self {
            FileFormat::DelimitedText => "CSV",
            FileFormat::SpreadsheetOpenXml => "Excel (xlsx)",
            FileFormat::SpreadsheetLegacyBinary => "Excel (xls)",
            FileFormat::SpreadsheetBinaryInterchange => "Excel (xlsb)",
        }
    }
}
