mod app;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

pub use app::{init_tracing, run, ServiceContext};
pub use application::use_cases::data_cleaner::{DataCleaner, COLUMN_SUFFIX};
pub use application::use_cases::file_processor::FileProcessor;
pub use application::use_cases::table_loader::{LoadedTable, TableLoader};
pub use domain::error::{AppError, Result};
pub use domain::table::{Cell, CleaningStats, FileFormat, RawInput, Table};
pub use infrastructure::config::AppConfig;
