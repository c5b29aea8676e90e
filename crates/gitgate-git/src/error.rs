//! Git protocol error types.

use thiserror::Error;

/// Errors that can occur during git protocol operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Invalid pkt-line format.
    #[error("invalid pkt-line: {0}")]
    InvalidPktLine(String),

    /// Service name outside of upload-pack / receive-pack.
    #[error("unknown service: {0}")]
    UnknownService(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
