//! Length-prefixed framing for the session stream.
//!
//! Every message on the wire is `[length: u32 little-endian][payload]`. The
//! length excludes the 4 prefix bytes. A zero-length frame is a valid
//! keepalive and yields an empty payload.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::TransportError;

/// Default maximum payload size: 1 MiB, comfortably above the largest full
/// world snapshot.
pub const DEFAULT_MAX_FRAME: usize = 1024 * 1024;

/// Read one frame, returning its payload.
///
/// Returns [`TransportError::ConnectionClosed`] when the peer closes before
/// a complete frame arrives, and [`TransportError::FrameTooLarge`] when the
/// advertised length exceeds `max_len` (the stream is then poisoned and the
/// caller must drop the connection).
pub async fn read_frame<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    max_len: usize,
) -> Result<Vec<u8>, TransportError> {
    let mut len_buf = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_buf).await {
        return Err(eof_as_closed(e));
    }

    let payload_len = u32::from_le_bytes(len_buf) as usize;
    if payload_len > max_len {
        return Err(TransportError::FrameTooLarge {
            size: payload_len,
            max: max_len,
        });
    }

    let mut payload = vec![0u8; payload_len];
    if payload_len > 0 {
        reader
            .read_exact(&mut payload)
            .await
            .map_err(eof_as_closed)?;
    }
    Ok(payload)
}

/// Write one frame.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    payload: &[u8],
    max_len: usize,
) -> Result<(), TransportError> {
    if payload.len() > max_len {
        return Err(TransportError::FrameTooLarge {
            size: payload.len(),
            max: max_len,
        });
    }

    writer.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    if !payload.is_empty() {
        writer.write_all(payload).await?;
    }
    writer.flush().await?;
    Ok(())
}

fn eof_as_closed(e: std::io::Error) -> TransportError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        TransportError::ConnectionClosed
    } else {
        TransportError::Io(e)
    }
}
