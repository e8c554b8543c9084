use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppError {
    UnsupportedFormat(String),
    DownloadFailure(String),
    UndecodableInput(String),
    LoadFailure { format: String, cause: String },
    EmptyInput,
    ParseError(String),
    ValidationError(String),
    NotFound(String),
    IoError(String),
    Internal(String),
}

impl AppError {
    /// Stable identifier used in structured error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::UnsupportedFormat(_) => "unsupported_format",
            AppError::DownloadFailure(_) => "download_failure",
            AppError::UndecodableInput(_) => "undecodable_input",
            AppError::LoadFailure { .. } => "load_failure",
            AppError::EmptyInput => "empty_input",
            AppError::ParseError(_) => "parse_error",
            AppError::ValidationError(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::IoError(_) => "io_error",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn load_failure(format: impl Into<String>, cause: impl fmt::Display) -> Self {
        AppError::LoadFailure {
            format: format.into(),
            cause: cause.to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            AppError::DownloadFailure(msg) => {
                write!(f, "Failed to download file from URL: {}", msg)
            }
            AppError::UndecodableInput(msg) => write!(f, "Could not decode input: {}", msg),
            AppError::LoadFailure { format, cause } => {
                write!(f, "Failed to parse {} file: {}", format, cause)
            }
            AppError::EmptyInput => write!(f, "Input file is empty"),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Background task failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
