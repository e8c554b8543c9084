// ============================================================
// LOADER SETTINGS
// ============================================================
// Tunables for encoding sniffing and header location

use serde::{Deserialize, Serialize};

/// Configuration for the table loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderSettings {
    /// Leading rows inspected when looking for a spreadsheet header (default: 100)
    ///
    /// A header sitting below this many blank rows is not detected.
    pub header_scan_rows: usize,

    /// Bytes fed to the charset detector (default: 100 KB)
    pub encoding_sample_bytes: usize,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            header_scan_rows: 100,
            encoding_sample_bytes: 100_000,
        }
    }
}

impl LoaderSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.header_scan_rows == 0 {
            return Err("header_scan_rows must be > 0".to_string());
        }
        if self.encoding_sample_bytes == 0 {
            return Err("encoding_sample_bytes must be > 0".to_string());
        }
        Ok(())
    }
}
