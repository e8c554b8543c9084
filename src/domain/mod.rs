pub mod error;

// Tabular ingestion and cleaning types
pub mod table;
