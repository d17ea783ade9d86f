//! Exit codes for CLI operations following Unix conventions.
//!
//! # Exit Code Semantics
//!
//! - `0`: Success - the command completed (a search must return at least one hit)
//! - `1`: General error - unspecified failure
//! - `2`: Blocking error - the index cannot be used at all
//! - `3-125`: Specific recoverable errors (`3` is a search with no hits)
//! - `126-255`: Reserved by shell

use crate::error::{ErrorCategory, LoadError, SearchError};

/// Standard exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation succeeded (code 0)
    Success = 0,

    /// Unspecified error occurred (code 1)
    GeneralError = 1,

    /// Index unusable, automation should halt (code 2)
    BlockingError = 2,

    /// Search ran but returned nothing (code 3)
    NotFound = 3,

    /// Bad command-line input such as a malformed query vector (code 4)
    InvalidInput = 4,

    /// Fetching an artifact failed (code 5)
    IoError = 5,

    /// Configuration error (code 6)
    ConfigError = 6,

    /// Index failed validation (code 7)
    IndexCorrupted = 7,

    /// Operation was cancelled (code 8)
    Cancelled = 8,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ErrorCategory> for ExitCode {
    fn from(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Structural | ErrorCategory::Numeric => ExitCode::IndexCorrupted,
            ErrorCategory::Input => ExitCode::InvalidInput,
            ErrorCategory::Io => ExitCode::IoError,
            ErrorCategory::Cancelled => ExitCode::Cancelled,
        }
    }
}

impl ExitCode {
    /// Map a fatal load error to an exit code.
    ///
    /// A manifest or centroid set that cannot be trusted blocks every later
    /// command, so structural failures here are blocking.
    pub fn from_load_error(error: &LoadError) -> Self {
        match error.category() {
            ErrorCategory::Structural | ErrorCategory::Numeric => ExitCode::BlockingError,
            other => other.into(),
        }
    }

    pub fn from_search_error(error: &SearchError) -> Self {
        error.category().into()
    }

    /// `Success` when the search produced hits, `NotFound` otherwise.
    pub fn from_result_count(count: usize) -> Self {
        if count > 0 {
            ExitCode::Success
        } else {
            ExitCode::NotFound
        }
    }

    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, ExitCode::BlockingError)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}
