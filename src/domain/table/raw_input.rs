// ============================================================
// RAW INPUT
// ============================================================
// Uploaded or downloaded bytes plus the declared filename

/// Immutable source bytes. Consumed once by the loader.
#[derive(Debug)]
pub struct RawInput {
    bytes: Vec<u8>,
    filename: String,
}

impl RawInput {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Size in MiB, for reporting.
    pub fn size_mb(&self) -> f64 {
        self.bytes.len() as f64 / (1024.0 * 1024.0)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
