//! Pack services exposed over smart HTTP.

use crate::pktline::{encode_line, FLUSH_PKT};
use crate::GitError;
use bytes::{Bytes, BytesMut};
use std::fmt;
use std::str::FromStr;

/// Prefix carried by the `service` query parameter and the RPC path.
const SERVICE_PREFIX: &str = "git-";

/// A git pack service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Serves fetch and clone.
    UploadPack,
    /// Accepts pushes.
    ReceivePack,
}

impl Service {
    /// Returns the bare service name, as passed to the git executable.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UploadPack => "upload-pack",
            Self::ReceivePack => "receive-pack",
        }
    }

    /// Parses an exact service name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "upload-pack" => Some(Self::UploadPack),
            "receive-pack" => Some(Self::ReceivePack),
            _ => None,
        }
    }

    /// Parses the `service` query parameter of `info/refs`.
    ///
    /// Only `git-upload-pack` and `git-receive-pack` select the smart
    /// protocol; anything else means the client wants the dumb protocol.
    pub fn from_query(value: &str) -> Option<Self> {
        value
            .strip_prefix(SERVICE_PREFIX)
            .and_then(Self::from_name)
    }

    /// Content type of the `info/refs` response in smart mode.
    pub fn advertisement_content_type(&self) -> String {
        format!("application/x-git-{}-advertisement", self.name())
    }

    /// Content type a client must send with an RPC request.
    pub fn request_content_type(&self) -> String {
        format!("application/x-git-{}-request", self.name())
    }

    /// Content type of an RPC response.
    pub fn result_content_type(&self) -> String {
        format!("application/x-git-{}-result", self.name())
    }

    /// The bytes that precede the subprocess output in a smart ref
    /// advertisement: the service line followed by a flush packet.
    pub fn advertisement_preamble(&self) -> Bytes {
        let line = encode_line(&format!("# service={SERVICE_PREFIX}{}\n", self.name()));
        let mut buf = BytesMut::with_capacity(line.len() + FLUSH_PKT.len());
        buf.extend_from_slice(&line);
        buf.extend_from_slice(FLUSH_PKT);
        buf.freeze()
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Service {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| GitError::UnknownService(s.to_string()))
    }
}
