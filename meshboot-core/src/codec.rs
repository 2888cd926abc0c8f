//! Length-prefixed frame codec
//!
//! Every message of the registration protocol is a frame: a 4-byte
//! big-endian payload length followed by that many bytes of JSON.
//! Reads and writes run to completion before the payload is interpreted.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the length prefix in bytes
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Largest payload accepted unless a caller configures otherwise
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Errors raised while reading or writing frames
#[derive(Debug, Error)]
pub enum FrameError {
    /// The underlying stream failed (including EOF in the middle of a frame)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The peer closed the stream before sending any byte of a frame
    #[error("connection closed by peer")]
    Closed,

    /// The announced payload exceeds the configured limit
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: usize },

    /// The payload is not the expected JSON message
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Serializes a message into a complete frame (prefix + payload)
pub fn encode_frame<T: Serialize + ?Sized>(message: &T) -> Result<Vec<u8>, FrameError> {
    let payload = serde_json::to_vec(message)?;
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge {
        len: payload.len(),
        max: u32::MAX as usize,
    })?;

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Writes one frame and flushes the writer
///
/// Returns the payload length.
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<usize, FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let frame = encode_frame(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(frame.len() - LENGTH_PREFIX_LEN)
}

/// Reads one frame and decodes its payload
///
/// A length above `max_len` is rejected before the payload is read.
pub async fn read_frame<R, T>(reader: &mut R, max_len: usize) -> Result<T, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let payload = read_frame_bytes(reader, max_len).await?;
    Ok(serde_json::from_slice(&payload)?)
}

/// Reads one frame and returns the raw payload
pub async fn read_frame_bytes<R>(reader: &mut R, max_len: usize) -> Result<Vec<u8>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_LEN];
    let mut filled = 0;
    while filled < LENGTH_PREFIX_LEN {
        match reader.read(&mut prefix[filled..]).await? {
            0 if filled == 0 => return Err(FrameError::Closed),
            0 => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside a length prefix",
                )
                .into());
            }
            n => filled += n,
        }
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > max_len {
        return Err(FrameError::TooLarge { len, max: max_len });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}
