//! Git pkt-line format implementation.
//!
//! Every line on the wire is prefixed with its own length, written as
//! lowercase hex and covering the prefix itself. "0000" is the flush packet.
//! The gateway only ever produces frames; client frames are forwarded to the
//! pack subprocess untouched.

use crate::{GitError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::io::Write;

/// Encoded flush packet.
pub const FLUSH_PKT: &[u8; 4] = b"0000";

/// Size of the length prefix.
const PREFIX_LEN: usize = 4;

/// A pkt-line packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    /// Data line with content.
    Data(Bytes),
    /// Flush packet (0000).
    Flush,
}

impl PktLine {
    /// Creates a data packet from a string slice.
    pub fn from_string(s: &str) -> Self {
        Self::Data(Bytes::copy_from_slice(s.as_bytes()))
    }

    /// Creates a data packet from bytes.
    pub fn from_bytes(b: impl Into<Bytes>) -> Self {
        Self::Data(b.into())
    }

    /// Encodes the packet to bytes.
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Data(data) => {
                let prefix = length_prefix(data.len() + PREFIX_LEN);
                let mut out = BytesMut::with_capacity(prefix.len() + data.len());
                out.put_slice(prefix.as_bytes());
                out.put_slice(data);
                out.freeze()
            }
            Self::Flush => Bytes::from_static(FLUSH_PKT),
        }
    }

    /// Returns true if this is a flush packet.
    pub fn is_flush(&self) -> bool {
        matches!(self, Self::Flush)
    }

    /// Returns the data content, or None for a flush.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(data) => Some(data),
            Self::Flush => None,
        }
    }
}

/// Formats `len` as lowercase hex, zero-padded to a multiple of four digits.
fn length_prefix(len: usize) -> String {
    let hex = format!("{:x}", len);
    let pad = (PREFIX_LEN - hex.len() % PREFIX_LEN) % PREFIX_LEN;
    let mut prefix = "0".repeat(pad);
    prefix.push_str(&hex);
    prefix
}

/// Encodes a text payload as a single data frame.
pub fn encode_line(payload: &str) -> Bytes {
    PktLine::from_string(payload).encode()
}

/// Reads the length declared by a frame's 4-digit hex prefix.
pub fn decode_length(frame: &[u8]) -> Result<usize> {
    let prefix = frame
        .get(..PREFIX_LEN)
        .ok_or_else(|| GitError::InvalidPktLine("frame shorter than prefix".to_string()))?;

    let prefix = std::str::from_utf8(prefix)
        .map_err(|_| GitError::InvalidPktLine("invalid length prefix".to_string()))?;

    if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(GitError::InvalidPktLine(format!(
            "non-hex length prefix: {prefix:?}"
        )));
    }

    usize::from_str_radix(prefix, 16)
        .map_err(|_| GitError::InvalidPktLine("invalid length".to_string()))
}

/// Writer for pkt-line format.
pub struct PktLineWriter<W> {
    writer: W,
}

impl<W: Write> PktLineWriter<W> {
    /// Creates a new pkt-line writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a packet.
    pub fn write(&mut self, pkt: &PktLine) -> Result<()> {
        self.writer.write_all(&pkt.encode())?;
        Ok(())
    }

    /// Writes a string payload verbatim as one data frame.
    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write(&PktLine::from_string(s))
    }

    /// Writes a flush packet.
    pub fn flush_pkt(&mut self) -> Result<()> {
        self.write(&PktLine::Flush)
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
