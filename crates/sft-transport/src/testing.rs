//! Testing utilities for channel implementations.

use crate::traits::{MessageChannel, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Mock channel for testing
pub struct MockChannel {
    sent: Mutex<Vec<Bytes>>,
    recv_queue: Mutex<VecDeque<Bytes>>,
    connected: AtomicBool,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            recv_queue: Mutex::new(VecDeque::new()),
            connected: AtomicBool::new(true),
        }
    }

    /// Queue a frame for the next `recv`.
    pub fn inject_recv(&self, frame: impl Into<Bytes>) {
        self.recv_queue.lock().push_back(frame.into());
    }

    /// Frames sent so far, oldest first.
    pub fn get_sent(&self) -> Vec<Bytes> {
        self.sent.lock().clone()
    }

    /// Simulate disconnect
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageChannel for MockChannel {
    async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        self.sent.lock().push(frame);
        Ok(())
    }

    async fn recv(&self) -> Result<Bytes, TransportError> {
        loop {
            if !self.is_connected() {
                return Err(TransportError::Disconnected);
            }
            if let Some(frame) = self.recv_queue.lock().pop_front() {
                return Ok(frame);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.disconnect();
        Ok(())
    }
}

/// In-memory channel pair for local testing.
///
/// Frames sent on one end arrive on the other. Closing either end
/// disconnects both.
pub struct LoopbackChannel {
    inbox: Arc<Mutex<VecDeque<Bytes>>>,
    outbox: Arc<Mutex<VecDeque<Bytes>>>,
    link: Arc<AtomicBool>,
}

impl LoopbackChannel {
    /// Create connected pair
    pub fn pair() -> (Self, Self) {
        let a_to_b = Arc::new(Mutex::new(VecDeque::new()));
        let b_to_a = Arc::new(Mutex::new(VecDeque::new()));
        let link = Arc::new(AtomicBool::new(true));

        let a = Self {
            inbox: b_to_a.clone(),
            outbox: a_to_b.clone(),
            link: link.clone(),
        };
        let b = Self {
            inbox: a_to_b,
            outbox: b_to_a,
            link,
        };
        (a, b)
    }
}

/// Shorthand for [`LoopbackChannel::pair`].
pub fn loopback_pair() -> (LoopbackChannel, LoopbackChannel) {
    LoopbackChannel::pair()
}

#[async_trait]
impl MessageChannel for LoopbackChannel {
    async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        self.outbox.lock().push_back(frame);
        Ok(())
    }

    async fn recv(&self) -> Result<Bytes, TransportError> {
        loop {
            // Drain what already arrived before reporting the close.
            if let Some(frame) = self.inbox.lock().pop_front() {
                return Ok(frame);
            }
            if !self.is_connected() {
                return Err(TransportError::Disconnected);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    fn is_connected(&self) -> bool {
        self.link.load(Ordering::Relaxed)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.link.store(false, Ordering::Relaxed);
        Ok(())
    }
}
