pub mod data_cleaner;
pub mod file_processor;
pub mod table_loader;
