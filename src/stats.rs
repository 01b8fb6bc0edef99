//! Failure counters
//!
//! One counter per failure category. Every tenth increment of a counter
//! logs a snapshot of all of them.

use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;

use crate::error::ErrorCode;

/// How often (in increments of a single counter) a snapshot is logged
pub const SNAPSHOT_EVERY: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    Download,
    Convert,
    Process,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation_errors",
            ErrorCategory::Download => "download_errors",
            ErrorCategory::Convert => "convert_errors",
            ErrorCategory::Process => "process_errors",
        }
    }
}

impl From<ErrorCode> for ErrorCategory {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::ValidationError => ErrorCategory::Validation,
            ErrorCode::SubNotFound | ErrorCode::DownloadFailed | ErrorCode::UnknownError => {
                ErrorCategory::Download
            }
            ErrorCode::ConvertError => ErrorCategory::Convert,
            ErrorCode::ProcessFailed => ErrorCategory::Process,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErrorSnapshot {
    pub validation_errors: u64,
    pub download_errors: u64,
    pub convert_errors: u64,
    pub process_errors: u64,
}

impl ErrorSnapshot {
    fn slot(&mut self, category: ErrorCategory) -> &mut u64 {
        match category {
            ErrorCategory::Validation => &mut self.validation_errors,
            ErrorCategory::Download => &mut self.download_errors,
            ErrorCategory::Convert => &mut self.convert_errors,
            ErrorCategory::Process => &mut self.process_errors,
        }
    }

    pub fn total(&self) -> u64 {
        self.validation_errors + self.download_errors + self.convert_errors + self.process_errors
    }
}

#[derive(Debug, Default)]
pub struct ErrorStats {
    counts: RwLock<ErrorSnapshot>,
}

impl ErrorStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one failure. Returns the category's new value.
    pub fn record(&self, category: ErrorCategory) -> u64 {
        let (value, snapshot) = {
            let mut counts = self.counts.write();
            let slot = counts.slot(category);
            *slot += 1;
            (*slot, *counts)
        };

        if value % SNAPSHOT_EVERY == 0 {
            tracing::error!(
                category = %category,
                validation_errors = snapshot.validation_errors,
                download_errors = snapshot.download_errors,
                convert_errors = snapshot.convert_errors,
                process_errors = snapshot.process_errors,
                "Error statistics"
            );
        }
        value
    }

    pub fn snapshot(&self) -> ErrorSnapshot {
        *self.counts.read()
    }

    pub fn get(&self, category: ErrorCategory) -> u64 {
        let mut snapshot = self.snapshot();
        *snapshot.slot(category)
    }
}
