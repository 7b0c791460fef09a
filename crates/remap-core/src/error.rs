//! Error types and error code constants for remap.
//!
//! `RemapError` is the single error type surfaced by the outer layers (config,
//! mapping load, artifact I/O, apply, cancellation). The resolution core never
//! returns it for individual occurrences: those degrade to diagnostics.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Resolution errors (mapping file or artifact not usable)
//! - `4`: Apply errors (failed to write changes)
//! - `10`: Internal errors (bugs, unexpected state, cancellation)

use std::fmt;

use thiserror::Error;

use crate::artifact::StoreError;
use crate::mapping::descriptor::DescriptorError;
use crate::mapping::MappingError;
use crate::patch::ApplyError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// Resolution errors (mapping unusable, artifact not found).
    ResolutionError = 3,
    /// Apply errors (failed to write changes, stale anchors).
    ApplyError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum RemapError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// A mapping table or chain could not be built.
    #[error("mapping error: {message}")]
    Mapping { message: String },

    /// Failed to apply changes.
    #[error("apply error: {message}")]
    ApplyError {
        message: String,
        file: Option<String>,
    },

    /// The run was cancelled; the in-flight round was discarded.
    #[error("remap cancelled during round {round}")]
    Cancelled { round: u32 },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&RemapError> for OutputErrorCode {
    fn from(err: &RemapError) -> Self {
        match err {
            RemapError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            RemapError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            RemapError::Mapping { .. } => OutputErrorCode::ResolutionError,
            RemapError::ApplyError { .. } => OutputErrorCode::ApplyError,
            RemapError::Cancelled { .. } => OutputErrorCode::InternalError,
            RemapError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<RemapError> for OutputErrorCode {
    fn from(err: RemapError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<MappingError> for RemapError {
    fn from(err: MappingError) -> Self {
        RemapError::Mapping {
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for RemapError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { path } => RemapError::FileNotFound { path },
            StoreError::InvalidPattern { pattern, reason } => RemapError::InvalidArguments {
                message: format!("invalid glob pattern '{}': {}", pattern, reason),
                details: None,
            },
            other => RemapError::InternalError {
                message: other.to_string(),
            },
        }
    }
}

impl From<DescriptorError> for RemapError {
    fn from(err: DescriptorError) -> Self {
        RemapError::invalid_args(err.to_string())
    }
}

impl From<ApplyError> for RemapError {
    fn from(err: ApplyError) -> Self {
        let file = err.file().map(str::to_string);
        RemapError::ApplyError {
            message: err.to_string(),
            file,
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl RemapError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        RemapError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        RemapError::FileNotFound { path: path.into() }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        RemapError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
