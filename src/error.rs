//! Error handling utilities shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result type used throughout the crate.
pub type Result<T, E = NgramError> = std::result::Result<T, E>;

/// Domain-specific error describing failures during configuration, IO, or model operations.
///
/// Numeric edge cases (zero-probability events, empty corpora) are deliberately
/// not errors: the evaluator recovers them into an infinite perplexity sentinel.
/// Variants here cover structural misuse and environment failures only.
#[derive(Debug, Error)]
pub enum NgramError {
    /// A configuration or model composition failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Catch-all variant for invariants that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl NgramError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }
}
