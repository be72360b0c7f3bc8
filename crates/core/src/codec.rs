// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Frame encoding for envelopes.
//!
//! Envelopes travel as UTF-8 JSON text frames. When compression is enabled
//! and the serialized envelope is larger than the threshold, the JSON bytes
//! are gzip-compressed and sent as a binary frame instead. Binary frames are
//! always treated as gzip on the way in.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::protocol::Envelope;

/// Upper bound on a decompressed frame.
pub const MAX_DECOMPRESSED_LEN: usize = 16 * 1024 * 1024;

/// Error type for codec operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame is not a valid envelope.
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),

    /// Compressing the envelope failed.
    #[error("compression failed: {0}")]
    Compress(std::io::Error),

    /// The binary frame is not valid gzip.
    #[error("decompression failed: {0}")]
    Decompress(std::io::Error),

    /// The binary frame inflates past [`MAX_DECOMPRESSED_LEN`].
    #[error("decompressed frame exceeds {MAX_DECOMPRESSED_LEN} bytes")]
    TooLarge,
}

/// A frame as handed to or received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 JSON envelope.
    Text(String),
    /// Gzip-compressed JSON envelope.
    Binary(Vec<u8>),
}

impl Frame {
    /// Size of the frame payload in bytes.
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(bytes) => bytes.len(),
        }
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true for binary frames.
    pub fn is_binary(&self) -> bool {
        matches!(self, Frame::Binary(_))
    }
}

/// When to compress outbound envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionPolicy {
    /// Whether compression is enabled at all.
    pub enabled: bool,
    /// Serialized size, in bytes, above which envelopes are compressed.
    pub threshold: usize,
}

impl CompressionPolicy {
    /// Never compress.
    pub fn disabled() -> Self {
        CompressionPolicy {
            enabled: false,
            threshold: usize::MAX,
        }
    }

    /// Returns true if a payload of `len` bytes should be compressed.
    pub fn applies(&self, len: usize) -> bool {
        self.enabled && len > self.threshold
    }
}

/// Gzip-compresses `data`.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).map_err(CodecError::Compress)?;
    encoder.finish().map_err(CodecError::Compress)
}

/// Inverse of [`compress`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let limit = (MAX_DECOMPRESSED_LEN as u64) + 1;
    let mut out = Vec::new();
    GzDecoder::new(data)
        .take(limit)
        .read_to_end(&mut out)
        .map_err(CodecError::Decompress)?;
    if out.len() > MAX_DECOMPRESSED_LEN {
        return Err(CodecError::TooLarge);
    }
    Ok(out)
}

/// Encodes an envelope into a frame, compressing it if the policy applies.
pub fn encode(envelope: &Envelope, policy: CompressionPolicy) -> Result<Frame, CodecError> {
    let json = envelope.to_json()?;
    if policy.applies(json.len()) {
        Ok(Frame::Binary(compress(json.as_bytes())?))
    } else {
        Ok(Frame::Text(json))
    }
}

/// Decodes a frame into an envelope.
pub fn decode(frame: &Frame) -> Result<Envelope, CodecError> {
    match frame {
        Frame::Text(text) => Ok(Envelope::from_json(text)?),
        Frame::Binary(bytes) => {
            let json = decompress(bytes)?;
            Ok(Envelope::from_slice(&json)?)
        }
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
