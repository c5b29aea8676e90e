//! Request body decoding for RPC requests.
//!
//! Gzip bodies are inflated chunk by chunk as the subprocess consumes them,
//! in bounded steps so that a small, highly compressed body never turns
//! into one huge allocation.
//!
//! The gzip header is parsed up front so that a body which is not gzip at
//! all is rejected before any process is started.

use axum::body::Body;
use bytes::Bytes;
use flate2::write::GzDecoder;
use futures::{stream, StreamExt, TryStreamExt};
use std::io::{self, Write};

use crate::bridge::ByteStream;

/// Turns a request body into the stream fed to the subprocess.
pub async fn request_stream(body: Body, gzip: bool) -> io::Result<ByteStream> {
    let raw: ByteStream = body.into_data_stream().map_err(io::Error::other).boxed();
    if !gzip {
        return Ok(raw);
    }

    let mut inflater = Inflater::new(raw);
    inflater.read_header().await?;
    Ok(inflater.into_stream())
}

/// Compressed bytes handed to the decoder per step. Deflate expands at most
/// about 1032:1, so this bounds what one step can produce.
const INPUT_SLICE: usize = 256;

/// Inflated bytes gathered before a chunk is yielded.
const OUTPUT_TARGET: usize = 32 * 1024;

struct Inflater {
    source: ByteStream,
    decoder: GzDecoder<Vec<u8>>,
    pending: Bytes,
    finished: bool,
}

impl Inflater {
    fn new(source: ByteStream) -> Self {
        Self {
            source,
            decoder: GzDecoder::new(Vec::new()),
            pending: Bytes::new(),
            finished: false,
        }
    }

    /// Pulls input until the gzip header has been parsed.
    async fn read_header(&mut self) -> io::Result<()> {
        while self.decoder.header().is_none() {
            if self.pending.is_empty() {
                match self.source.next().await {
                    Some(chunk) => self.pending = chunk?,
                    None => {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "gzip body ended before its header",
                        ))
                    }
                }
            }
            self.feed_slice()?;
        }
        Ok(())
    }

    fn feed_slice(&mut self) -> io::Result<()> {
        let slice = self.pending.split_to(self.pending.len().min(INPUT_SLICE));
        self.decoder.write_all(&slice)
    }

    async fn next_chunk(&mut self) -> Option<io::Result<Bytes>> {
        loop {
            while !self.pending.is_empty() && self.decoder.get_ref().len() < OUTPUT_TARGET {
                if let Err(e) = self.feed_slice() {
                    self.pending.clear();
                    self.finished = true;
                    return Some(Err(e));
                }
            }

            let inflated = std::mem::take(self.decoder.get_mut());
            if !inflated.is_empty() {
                return Some(Ok(Bytes::from(inflated)));
            }
            if self.finished {
                return None;
            }

            match self.source.next().await {
                Some(Ok(chunk)) => self.pending = chunk,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                None => {
                    self.finished = true;
                    if let Err(e) = self.decoder.try_finish() {
                        return Some(Err(e));
                    }
                }
            }
        }
    }

    fn into_stream(self) -> ByteStream {
        stream::unfold(self, |mut inflater| async move {
            inflater.next_chunk().await.map(|chunk| (chunk, inflater))
        })
        .boxed()
    }
}
