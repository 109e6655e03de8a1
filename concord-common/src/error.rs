//! Common error types for Concord

use thiserror::Error;

/// Common result type for Concord operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Concord crates
///
/// Malformed claims are not errors: the canonicalizer turns them into
/// rejections that travel in the result document. Only failures that make a
/// run impossible (or untrustworthy) surface here.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request could not be understood at all (not a per-claim problem)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The engine broke one of its own invariants; the run must be abandoned
    #[error("Internal invariant violated: {0}")]
    Invariant(String),

    /// JSON encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
