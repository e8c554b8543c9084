// ============================================================
// TABULAR INFRASTRUCTURE LAYER
// ============================================================
// CSV decoding, worksheet reading, and xlsx output

mod csv_parser;
mod encoding_resolver;
mod header_locator;
mod xlsx_writer;

pub use csv_parser::CsvParser;
pub use encoding_resolver::{Detection, EncodingResolver, FALLBACK_ENCODINGS};
pub use header_locator::{cell_to_text, HeaderLocator};
pub use xlsx_writer::{write_xlsx, SHEET_NAME};
