use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::source::SourceError;

/// Main error type for the subtitle service
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed caption input: {0}")]
    MalformedInput(String),

    #[error("Unsupported conversion target: {0}")]
    UnsupportedTarget(String),

    #[error("Caption source error: {0}")]
    Source(#[from] SourceError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Per-job failure categories reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Identifier does not match the supported address grammar
    ValidationError,
    /// The source has no captions for the requested language
    SubNotFound,
    /// Transport failure that survived every retry
    DownloadFailed,
    /// Any unclassified fetch failure
    UnknownError,
    /// Conversion of an otherwise successful fetch failed
    ConvertError,
    /// The worker itself failed unexpectedly
    ProcessFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::SubNotFound => "SUB_NOT_FOUND",
            ErrorCode::DownloadFailed => "DOWNLOAD_FAILED",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
            ErrorCode::ConvertError => "CONVERT_ERROR",
            ErrorCode::ProcessFailed => "PROCESS_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ServiceError>;
