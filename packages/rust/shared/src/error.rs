//! Error types for filinglens.
//!
//! Library crates use [`FilingLensError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all filinglens operations.
#[derive(Debug, thiserror::Error)]
pub enum FilingLensError {
    /// An issuer or document could not be found. User-correctable.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// The disclosure registry or another upstream service failed.
    /// Carries the upstream message verbatim.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// A downloaded archive held no extractable document.
    #[error("no content: {0}")]
    NoContent(String),

    /// A required credential or setting is missing or invalid.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A registry payload could not be decoded.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Caller input failed validation (empty token, bad date range, ...).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The run exceeded its caller-imposed deadline and was abandoned.
    #[error("deadline of {secs}s exceeded")]
    Deadline { secs: u64 },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FilingLensError>;

impl FilingLensError {
    /// Create a not-found error from any displayable message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound {
            message: msg.into(),
        }
    }

    /// Create a configuration error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = FilingLensError::config("DART_API_KEY is not set");
        assert_eq!(err.to_string(), "configuration error: DART_API_KEY is not set");

        let err = FilingLensError::Upstream("조회된 데이타가 없습니다.".into());
        assert!(err.to_string().starts_with("upstream error:"));

        let err = FilingLensError::Deadline { secs: 300 };
        assert_eq!(err.to_string(), "deadline of 300s exceeded");
    }
}
