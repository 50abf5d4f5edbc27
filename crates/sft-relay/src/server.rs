//! TCP relay hub
//!
//! Every frame a peer sends is forwarded, unchanged, to every other peer
//! connected at that moment. The relay never parses envelopes and never
//! echoes a frame back to its sender.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use sft_transport::{LengthCodec, MessageChannel, TcpChannel, TransportError};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;

#[derive(Clone, Debug)]
struct RelayedFrame {
    from: u64,
    data: Bytes,
}

/// Live counters.
#[derive(Debug, Default)]
pub struct RelayStats {
    peers: AtomicUsize,
    frames_relayed: AtomicU64,
    frames_dropped: AtomicU64,
}

impl RelayStats {
    pub fn peers(&self) -> usize {
        self.peers.load(Ordering::Relaxed)
    }

    /// Frames accepted from a sender for broadcast.
    pub fn frames_relayed(&self) -> u64 {
        self.frames_relayed.load(Ordering::Relaxed)
    }

    /// Frames lost by peers that fell behind.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }
}

/// Relay server
pub struct RelayServer {
    config: ServerConfig,
    listener: TcpListener,
    frames: broadcast::Sender<RelayedFrame>,
    slots: Arc<Semaphore>,
    stats: Arc<RelayStats>,
}

impl RelayServer {
    /// Bind the listening socket.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
        let (frames, _) = broadcast::channel(config.broadcast_capacity);

        Ok(Self {
            slots: Arc::new(Semaphore::new(config.max_peers)),
            config,
            listener,
            frames,
            stats: Arc::new(RelayStats::default()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn stats(&self) -> Arc<RelayStats> {
        self.stats.clone()
    }

    /// Run the relay server
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept peers until `shutdown` resolves.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        info!(
            listen_addr = %self.local_addr()?,
            max_peers = self.config.max_peers,
            max_frame_size = self.config.max_frame_size,
            "relay listening"
        );

        tokio::pin!(shutdown);
        let mut next_id = 0u64;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(peers = self.stats.peers(), "relay shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    };

                    let permit = match self.slots.clone().try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            warn!(%addr, max_peers = self.config.max_peers, "peer limit reached, refusing connection");
                            continue;
                        }
                    };

                    next_id += 1;
                    self.admit(next_id, stream, permit);
                }
            }
        }
    }

    fn admit(&self, id: u64, stream: TcpStream, permit: OwnedSemaphorePermit) {
        let codec = LengthCodec::new(self.config.max_frame_size);
        let channel = match TcpChannel::from_stream(stream, codec) {
            Ok(channel) => Arc::new(channel),
            Err(e) => {
                warn!(peer = id, error = %e, "could not set up peer");
                return;
            }
        };

        // Subscribe before the peer counts as joined so it sees every later frame.
        let inbox = self.frames.subscribe();
        let peers = self.stats.peers.fetch_add(1, Ordering::Relaxed) + 1;
        info!(peer = id, addr = %channel.peer_addr(), peers, "peer joined");

        let frames = self.frames.clone();
        let stats = self.stats.clone();
        tokio::spawn(async move {
            serve_peer(id, channel, frames, inbox, &stats).await;
            let peers = stats.peers.fetch_sub(1, Ordering::Relaxed) - 1;
            info!(peer = id, peers, "peer left");
            drop(permit);
        });
    }
}

async fn serve_peer(
    id: u64,
    channel: Arc<TcpChannel>,
    frames: broadcast::Sender<RelayedFrame>,
    mut inbox: broadcast::Receiver<RelayedFrame>,
    stats: &RelayStats,
) {
    let writer = {
        let channel = channel.clone();
        async move {
            loop {
                match inbox.recv().await {
                    Ok(frame) if frame.from == id => {}
                    Ok(frame) => {
                        if let Err(e) = channel.send(frame.data).await {
                            debug!(peer = id, error = %e, "forward failed");
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        stats.frames_dropped.fetch_add(missed, Ordering::Relaxed);
                        warn!(peer = id, missed, "peer too slow, frames dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        }
    };

    let reader = async {
        loop {
            match channel.recv().await {
                Ok(data) => {
                    debug!(peer = id, len = data.len(), "relaying frame");
                    stats.frames_relayed.fetch_add(1, Ordering::Relaxed);
                    // No receivers is fine: the sender may be alone.
                    let _ = frames.send(RelayedFrame { from: id, data });
                }
                Err(TransportError::Disconnected) => return,
                Err(e) => {
                    warn!(peer = id, error = %e, "dropping peer");
                    return;
                }
            }
        }
    };

    // Whichever side finishes first ends the peer.
    tokio::select! {
        _ = writer => {}
        _ = reader => {}
    }
    let _ = channel.close().await;
}
