//! Git transport primitives for Gitgate.
//!
//! This crate holds the pieces of the git smart HTTP protocol that do not
//! depend on an HTTP stack: pkt-line framing and the identity of the two
//! pack services a gateway can expose.

mod error;
mod pktline;
mod service;

pub use error::GitError;
pub use pktline::{decode_length, encode_line, PktLine, PktLineWriter, FLUSH_PKT};
pub use service::Service;

/// Result type for git protocol operations.
pub type Result<T> = std::result::Result<T, GitError>;
