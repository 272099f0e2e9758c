//! Structured error types shared across the crate.

use thiserror::Error;

/// Unified error type for all enrichment operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file not found, permission denied, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input file
    #[error("parse error in {path} at line {line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    /// No valid records in the input
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Meta-analysis inputs are incompatible
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Numerical failure (degenerate statistics, non-convergence)
    #[error("computation failed: {0}")]
    Computation(String),

    /// Invalid in-memory input or configuration
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn parse(path: &str, line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            path: path.to_string(),
            line,
            message: message.into(),
        }
    }
}
