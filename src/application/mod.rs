pub mod use_cases;

pub use use_cases::data_cleaner::DataCleaner;
pub use use_cases::file_processor::FileProcessor;
pub use use_cases::table_loader::TableLoader;
