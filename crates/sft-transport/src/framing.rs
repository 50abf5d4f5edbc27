//! Length-prefixed framing for reliable message delimiting.
//!
//! Format: length (4 bytes BE) || data

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default maximum frame size (96 MiB).
///
/// A 64 MiB file grows to ~85.4 MiB once base64 encoded; the rest is room
/// for the signature, public key and JSON field names.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 96 * 1024 * 1024;

const LEN_PREFIX: usize = 4;

/// Framing error
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("Frame too large: {0} bytes (max: {1})")]
    TooLarge(usize, usize),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Length-prefixed frame codec
#[derive(Debug, Clone, Copy)]
pub struct LengthCodec {
    max_frame_size: usize,
}

impl Default for LengthCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl LengthCodec {
    /// Create a new codec with the specified maximum frame size.
    ///
    /// Sizes above `u32::MAX` are clamped, the prefix cannot express more.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            max_frame_size: max_frame_size.min(u32::MAX as usize),
        }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    fn check_len(&self, len: usize) -> Result<(), FramingError> {
        if len > self.max_frame_size {
            return Err(FramingError::TooLarge(len, self.max_frame_size));
        }
        Ok(())
    }

    /// Encode data with length prefix
    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>, FramingError> {
        self.check_len(data.len())?;

        let mut encoded = Vec::with_capacity(LEN_PREFIX + data.len());
        encoded.put_u32(data.len() as u32);
        encoded.extend_from_slice(data);
        Ok(encoded)
    }

    /// Split the next complete frame off the front of `buf`.
    ///
    /// Returns `Ok(None)` while the frame is still incomplete, leaving the
    /// buffered bytes in place so more data can be appended. The length is
    /// checked as soon as the prefix is in, before any room is reserved for
    /// the body.
    pub fn decode_buf(&self, buf: &mut BytesMut) -> Result<Option<Bytes>, FramingError> {
        if buf.len() < LEN_PREFIX {
            return Ok(None);
        }
        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        self.check_len(len)?;
        if buf.len() < LEN_PREFIX + len {
            buf.reserve(LEN_PREFIX + len - buf.len());
            return Ok(None);
        }
        buf.advance(LEN_PREFIX);
        Ok(Some(buf.split_to(len).freeze()))
    }

    /// Read the next frame from an async reader.
    ///
    /// Partial reads accumulate in `buf`, which the caller keeps between
    /// calls. Dropping the future loses nothing: the next call resumes from
    /// the buffered bytes.
    pub async fn read_frame<R>(&self, reader: &mut R, buf: &mut BytesMut) -> Result<Bytes, FramingError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            if let Some(frame) = self.decode_buf(buf)? {
                return Ok(frame);
            }
            if reader.read_buf(buf).await? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream closed with {} bytes of a frame buffered", buf.len()),
                )
                .into());
            }
        }
    }

    /// Write one frame and flush.
    pub async fn write_frame<W>(&self, writer: &mut W, data: &[u8]) -> Result<(), FramingError>
    where
        W: AsyncWrite + Unpin,
    {
        let framed = self.encode(data)?;
        writer.write_all(&framed).await?;
        writer.flush().await?;
        Ok(())
    }
}
