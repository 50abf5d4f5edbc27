//! Framed TCP channel.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::framing::{FramingError, LengthCodec};
use crate::traits::{MessageChannel, TransportError};

/// How hard to try when establishing a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    /// Total connection attempts, at least 1.
    pub attempts: u32,
    /// Pause between failed attempts.
    pub delay: Duration,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

/// Read half plus the bytes of any frame still in flight.
struct FrameReader {
    half: OwnedReadHalf,
    buf: BytesMut,
}

/// A [`MessageChannel`] over one TCP stream with length-prefixed frames.
///
/// `recv` is cancellation safe, so it can sit under a timeout or `select!`.
pub struct TcpChannel {
    reader: Mutex<FrameReader>,
    writer: Mutex<OwnedWriteHalf>,
    codec: LengthCodec,
    peer: SocketAddr,
    connected: AtomicBool,
}

impl TcpChannel {
    /// Wrap an accepted or connected stream.
    pub fn from_stream(stream: TcpStream, codec: LengthCodec) -> Result<Self, TransportError> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: Mutex::new(FrameReader {
                half: reader,
                buf: BytesMut::new(),
            }),
            writer: Mutex::new(writer),
            codec,
            peer,
            connected: AtomicBool::new(true),
        })
    }

    /// Connect to `addr`, retrying according to `policy`.
    pub async fn connect_with_retry(
        addr: &str,
        policy: ConnectPolicy,
        codec: LengthCodec,
    ) -> Result<Self, TransportError> {
        let attempts = policy.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    info!(%addr, attempt, "connected");
                    return Self::from_stream(stream, codec);
                }
                Err(e) => {
                    warn!(%addr, attempt, attempts, error = %e, "connection attempt failed");
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(policy.delay).await;
                    }
                }
            }
        }

        Err(TransportError::ConnectFailed {
            addr: addr.to_string(),
            attempts,
            reason: last_error,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn mark_disconnected(&self, err: FramingError) -> TransportError {
        self.connected.store(false, Ordering::Relaxed);
        match err {
            FramingError::Io(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::UnexpectedEof
                        | std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::BrokenPipe
                ) =>
            {
                TransportError::Disconnected
            }
            other => TransportError::Framing(other),
        }
    }
}

#[async_trait]
impl MessageChannel for TcpChannel {
    async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        let mut writer = self.writer.lock().await;
        match self.codec.write_frame(&mut *writer, &frame).await {
            Ok(()) => {
                debug!(peer = %self.peer, len = frame.len(), "frame sent");
                Ok(())
            }
            // An oversized frame is the caller's problem, not a dead socket.
            Err(e @ FramingError::TooLarge(..)) => Err(TransportError::Framing(e)),
            Err(e) => Err(self.mark_disconnected(e)),
        }
    }

    async fn recv(&self) -> Result<Bytes, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        let mut reader = self.reader.lock().await;
        let FrameReader { half, buf } = &mut *reader;
        match self.codec.read_frame(half, buf).await {
            Ok(frame) => {
                debug!(peer = %self.peer, len = frame.len(), "frame received");
                Ok(frame)
            }
            Err(e) => Err(self.mark_disconnected(e)),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::Relaxed);
        let mut writer = self.writer.lock().await;
        writer.shutdown().await?;
        Ok(())
    }
}
