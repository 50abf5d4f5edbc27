//! Envelopes over a [`MessageChannel`].
//!
//! Each envelope travels as exactly one JSON frame, so delivery is atomic
//! and the text fields arrive exactly as they were sent.

use bytes::Bytes;
use sft_crypto::{EncodedPrivateKey, SignatureAlgorithm};
use sft_transport::MessageChannel;
use tracing::info;

use crate::envelope::TransferEnvelope;
use crate::errors::TransferError;
use crate::session::TransferSession;
use crate::source::OutboundFile;
use crate::tasks;

/// Sends and receives whole [`TransferEnvelope`]s.
pub struct ChannelAdapter<C> {
    channel: C,
}

impl<C: MessageChannel> ChannelAdapter<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn into_inner(self) -> C {
        self.channel
    }

    pub async fn send_envelope(&self, envelope: &TransferEnvelope) -> Result<(), TransferError> {
        envelope.validate()?;
        let frame = Bytes::from(envelope.to_json()?);
        let frame_len = frame.len();
        self.channel.send(frame).await?;

        info!(
            file_name = %envelope.file_name,
            frame_len,
            algorithm = %envelope.algorithm,
            "envelope sent"
        );
        Ok(())
    }

    /// Wait for the next frame and parse it as an envelope.
    pub async fn recv_envelope(&self) -> Result<TransferEnvelope, TransferError> {
        let frame = self.channel.recv().await?;
        let envelope = TransferEnvelope::from_slice(&frame)?;

        info!(
            file_name = %envelope.file_name,
            frame_len = frame.len(),
            "envelope received"
        );
        Ok(envelope)
    }

    /// Seal `file` and send it. Returns the envelope that went out.
    pub async fn send_file(
        &self,
        file: OutboundFile,
        algorithm: SignatureAlgorithm,
        private_key: EncodedPrivateKey,
    ) -> Result<TransferEnvelope, TransferError> {
        let envelope = tasks::seal(file, algorithm, private_key).await?;
        self.send_envelope(&envelope).await?;
        Ok(envelope)
    }

    /// Receive the next envelope and open a session for it. Unverified.
    pub async fn receive_next(&self) -> Result<TransferSession, TransferError> {
        let envelope = self.recv_envelope().await?;
        TransferSession::open(envelope)
    }

    pub async fn close(&self) -> Result<(), TransferError> {
        self.channel.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sft_crypto::{KeyManager, KeyParams, VerificationResult};
    use sft_transport::{loopback_pair, MockChannel, TransportError};

    #[tokio::test]
    async fn test_one_frame_per_envelope() {
        let pair = KeyManager::new(KeyParams::ed25519()).generate().unwrap();
        let adapter = ChannelAdapter::new(MockChannel::new());

        let file = OutboundFile::new("a.txt", "text/plain", b"abc".to_vec());
        let sent = adapter
            .send_file(file, pair.algorithm(), pair.private_key().clone())
            .await
            .unwrap();

        let frames = adapter.channel().get_sent();
        assert_eq!(frames.len(), 1);
        assert_eq!(TransferEnvelope::from_slice(&frames[0]).unwrap(), sent);
    }

    #[tokio::test]
    async fn test_receive_next_over_loopback() {
        let pair = KeyManager::new(KeyParams::ed25519()).generate().unwrap();
        let (a, b) = loopback_pair();
        let sender = ChannelAdapter::new(a);
        let receiver = ChannelAdapter::new(b);

        let file = OutboundFile::new("a.txt", "text/plain", b"abc".to_vec());
        sender
            .send_file(file, pair.algorithm(), pair.private_key().clone())
            .await
            .unwrap();

        let mut session = receiver.receive_next().await.unwrap();
        assert_eq!(session.bytes(), b"abc");
        assert!(!session.is_verified());
        assert_eq!(session.verify(), VerificationResult::Valid);
    }

    #[tokio::test]
    async fn test_garbage_frame_is_envelope_error() {
        let adapter = ChannelAdapter::new(MockChannel::new());
        adapter.channel().inject_recv(&b"{not json"[..]);
        let err = adapter.recv_envelope().await.unwrap_err();
        assert!(matches!(err, TransferError::Envelope(_)));
    }

    #[tokio::test]
    async fn test_disconnected_channel() {
        let adapter = ChannelAdapter::new(MockChannel::new());
        adapter.close().await.unwrap();
        let err = adapter.recv_envelope().await.unwrap_err();
        assert!(matches!(err, TransferError::Transport(TransportError::Disconnected)));
    }
}
