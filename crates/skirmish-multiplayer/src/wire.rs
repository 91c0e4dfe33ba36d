//! Frame payload encoding: versioned message bytes behind a compression
//! flag.
//!
//! Full snapshots compress well and dominate join traffic; per-tick input
//! packets are tiny and skip compression. Layout on the wire (inside the
//! transport's length-prefixed frame):
//!
//! ```text
//! [flag: u8] [payload]        flag 0x00: payload = version byte + postcard
//!                             flag 0x01: payload = LZ4 (size-prepended)
//! ```

use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::messages::{Message, MessageError, deserialize_message, serialize_message};

/// Flag byte: payload is uncompressed.
pub const COMPRESSION_FLAG_NONE: u8 = 0x00;

/// Flag byte: payload is LZ4-compressed.
pub const COMPRESSION_FLAG_LZ4: u8 = 0x01;

/// Serialized size above which payloads are compressed.
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 512;

/// Errors that can occur while decoding a frame payload.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The payload was empty — no compression flag.
    #[error("empty frame payload")]
    EmptyPayload,

    /// An unknown compression flag byte.
    #[error("unknown compression flag: {0:#04x}")]
    UnknownFlag(u8),

    /// LZ4 decompression failed.
    #[error("decompression failed: {0}")]
    Decompress(String),

    /// The decompressed payload failed message deserialization.
    #[error(transparent)]
    Message(#[from] MessageError),

    /// Serialization failed (encode side).
    #[error("serialization error: {0}")]
    Serialize(#[from] postcard::Error),
}

/// Encode a message into a frame payload, compressing above `threshold`.
pub fn encode_frame(msg: &Message, threshold: usize) -> Result<Vec<u8>, WireError> {
    let body = serialize_message(msg)?;
    if body.len() < threshold {
        let mut out = Vec::with_capacity(1 + body.len());
        out.push(COMPRESSION_FLAG_NONE);
        out.extend_from_slice(&body);
        Ok(out)
    } else {
        let compressed = compress_prepend_size(&body);
        let mut out = Vec::with_capacity(1 + compressed.len());
        out.push(COMPRESSION_FLAG_LZ4);
        out.extend_from_slice(&compressed);
        Ok(out)
    }
}

/// Decode a frame payload back into a message.
pub fn decode_frame(data: &[u8]) -> Result<Message, WireError> {
    let (&flag, rest) = data.split_first().ok_or(WireError::EmptyPayload)?;
    match flag {
        COMPRESSION_FLAG_NONE => Ok(deserialize_message(rest)?),
        COMPRESSION_FLAG_LZ4 => {
            let body =
                decompress_size_prepended(rest).map_err(|e| WireError::Decompress(e.to_string()))?;
            Ok(deserialize_message(&body)?)
        }
        other => Err(WireError::UnknownFlag(other)),
    }
}
