//! Error types for refwriter.
//!
//! Library crates use [`RefWriterError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all refwriter operations.
#[derive(Debug, thiserror::Error)]
pub enum RefWriterError {
    /// Configuration loading or validation error (fatal at startup).
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to a remote page or API.
    #[error("network error: {0}")]
    Network(String),

    /// HTML or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Search provider error (request failed or provider reported an error).
    #[error("search error: {0}")]
    Search(String),

    /// Article storage collaborator error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The storage collaborator has no article with this identifier.
    #[error("article not found: {id}")]
    NotFound { id: String },

    /// Generative model error (request, malformed response, empty output).
    #[error("rewrite error: {0}")]
    Rewrite(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RefWriterError>;

impl RefWriterError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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

    /// Create a not-found error for an article identifier.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
