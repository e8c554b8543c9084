// ============================================================
// TABLE DOMAIN LAYER
// ============================================================
// Core types for tabular ingestion and cleaning
// No I/O, no async

mod cleaning_stats;
mod file_format;
mod loader_settings;
mod raw_input;
mod table;

pub use cleaning_stats::CleaningStats;
pub use file_format::FileFormat;
pub use loader_settings::LoaderSettings;
pub use raw_input::RawInput;
pub use table::{is_missing_row, is_na_token, na_to_missing, Cell, Table, NA_TOKENS};
