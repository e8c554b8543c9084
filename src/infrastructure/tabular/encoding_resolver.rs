// ============================================================
// ENCODING RESOLVER
// ============================================================
// Sniff the charset of delimited text and trial-parse candidates

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use tracing::{debug, info, warn};

use crate::domain::error::AppError;
use crate::domain::table::Table;

use super::csv_parser::CsvParser;

/// Fallback labels tried after the detected encoding.
///
/// Labels follow the WHATWG registry used by `encoding_rs`, where the
/// Latin-1 family all resolves to windows-1252.
pub const FALLBACK_ENCODINGS: &[&str] = &[
    "utf-8",
    "latin1",
    "iso-8859-1",
    "cp1252",
    "windows-1252",
    "utf-16",
];

/// Result of charset sniffing on the sample prefix
#[derive(Debug, Clone, Copy)]
pub struct Detection {
    pub encoding: &'static Encoding,
    /// chardetng's yes/no assessment of its guess; there is no numeric score
    pub high_confidence: bool,
}

pub struct EncodingResolver {
    sample_bytes: usize,
}

impl Default for EncodingResolver {
    fn default() -> Self {
        Self {
            sample_bytes: 100_000,
        }
    }
}

impl EncodingResolver {
    pub fn new(sample_bytes: usize) -> Self {
        Self {
            sample_bytes: sample_bytes.max(1),
        }
    }

    /// Guess the encoding from a bounded prefix of `bytes`.
    ///
    /// A pure ASCII sample is reported as UTF-8.
    pub fn detect(&self, bytes: &[u8]) -> Detection {
        let sample_len = bytes.len().min(self.sample_bytes);
        if bytes[..sample_len].is_ascii() {
            return Detection {
                encoding: encoding_rs::UTF_8,
                high_confidence: true,
            };
        }
        let mut detector = EncodingDetector::new();
        detector.feed(&bytes[..sample_len], sample_len == bytes.len());
        let (encoding, high_confidence) = detector.guess_assess(None, true);
        Detection {
            encoding,
            high_confidence,
        }
    }

    /// Detected encoding first, then the fallbacks, without repeats.
    pub fn candidates(detected: &'static Encoding) -> Vec<&'static Encoding> {
        let mut out: Vec<&'static Encoding> = vec![detected];
        for label in FALLBACK_ENCODINGS {
            if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
                if !out.contains(&encoding) {
                    out.push(encoding);
                }
            }
        }
        out
    }

    /// Decode and parse `bytes`, returning the table and the encoding used.
    ///
    /// Undecodable sequences become U+FFFD rather than failing the attempt;
    /// an attempt fails only when the parser cannot produce a header.
    pub fn resolve(&self, bytes: &[u8]) -> Result<(Table, String), AppError> {
        let detection = self.detect(bytes);
        info!(
            detected = detection.encoding.name(),
            high_confidence = detection.high_confidence,
            "Detected CSV encoding"
        );

        let mut last_error: Option<AppError> = None;

        for candidate in Self::candidates(detection.encoding) {
            debug!(encoding = candidate.name(), "Trying encoding");

            // A byte order mark overrides the candidate.
            let (text, used, had_errors) = candidate.decode(bytes);
            if had_errors {
                warn!(
                    encoding = used.name(),
                    "Replaced undecodable byte sequences"
                );
            }

            match CsvParser::new().parse_content(&text) {
                Ok(table) => {
                    info!(
                        encoding = used.name(),
                        rows = table.row_count(),
                        columns = table.column_count(),
                        "Parsed CSV"
                    );
                    return Ok((table, used.name().to_string()));
                }
                Err(e) => {
                    warn!(encoding = used.name(), error = %e, "Encoding attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(AppError::UndecodableInput(format!(
            "Detected: {}, Error: {}",
            detection.encoding.name(),
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no candidate encodings".to_string())
        )))
    }
}
