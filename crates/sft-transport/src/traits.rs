//! Channel trait and transport errors.

use async_trait::async_trait;
use bytes::Bytes;

use crate::framing::FramingError;

/// A connected duplex message channel.
///
/// One `send` is one frame on the other side: no partial delivery and no
/// re-encoding of the payload.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Send one frame.
    async fn send(&self, frame: Bytes) -> Result<(), TransportError>;

    /// Receive the next frame, waiting until one arrives.
    async fn recv(&self) -> Result<Bytes, TransportError>;

    /// Check if the channel is still usable.
    fn is_connected(&self) -> bool;

    /// Close the channel. Further sends fail with `Disconnected`.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Common transport error type
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport disconnected")]
    Disconnected,

    #[error("Failed to connect to {addr} after {attempts} attempt(s): {reason}")]
    ConnectFailed {
        addr: String,
        attempts: u32,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("Other error: {0}")]
    Other(String),
}
