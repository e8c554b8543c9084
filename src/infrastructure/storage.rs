use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

use crate::domain::error::{AppError, Result};

static UNSAFE_FILE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("static regex"));

const MAX_FILE_NAME_LEN: usize = 100;

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            AppError::IoError(format!("Failed to create dir {}: {e}", path.display()))
        })?;
    }
    Ok(())
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Only the last path segment is kept, runs of unsafe characters become
/// `_`, and the result is capped at 100 chars keeping the extension end.
pub fn sanitize_file_name(name: &str) -> String {
    let last = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned = UNSAFE_FILE_CHARS.replace_all(last, "_");
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        return "file".to_string();
    }

    let chars: Vec<char> = cleaned.chars().collect();
    if chars.len() > MAX_FILE_NAME_LEN {
        chars[chars.len() - MAX_FILE_NAME_LEN..].iter().collect()
    } else {
        cleaned.to_string()
    }
}
