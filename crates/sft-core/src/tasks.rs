//! Async entry points for the CPU-bound crypto operations.
//!
//! Each call moves owned inputs onto the blocking pool with
//! [`tokio::task::spawn_blocking`], so RSA key generation or signing a large
//! file never stalls the async runtime. No locks are held while the work
//! runs, and nothing is retried or timed out here; wrap calls in
//! `tokio::time::timeout` where a bound is needed.

use bytes::Bytes;
use sft_crypto::{
    EncodedBytes, EncodedPrivateKey, KeyPair, KeyParams, SignatureAlgorithm, VerificationResult,
};
use tokio::task::JoinError;

use crate::envelope::TransferEnvelope;
use crate::errors::TransferError;
use crate::session::TransferSession;
use crate::source::OutboundFile;

fn join_error(e: JoinError) -> TransferError {
    TransferError::Task(e.to_string())
}

pub async fn generate_key_pair(params: KeyParams) -> Result<KeyPair, TransferError> {
    let pair = tokio::task::spawn_blocking(move || sft_crypto::generate_key_pair(params))
        .await
        .map_err(join_error)??;
    Ok(pair)
}

pub async fn sign(
    algorithm: SignatureAlgorithm,
    private_key: EncodedPrivateKey,
    message: Bytes,
) -> Result<EncodedBytes, TransferError> {
    let signature =
        tokio::task::spawn_blocking(move || sft_crypto::sign(algorithm, &private_key, &message))
            .await
            .map_err(join_error)??;
    Ok(signature)
}

pub async fn verify(
    algorithm: SignatureAlgorithm,
    public_key: EncodedBytes,
    signature: EncodedBytes,
    message: Bytes,
) -> Result<VerificationResult, TransferError> {
    tokio::task::spawn_blocking(move || {
        sft_crypto::verify(algorithm, &public_key, &signature, &message)
    })
    .await
    .map_err(join_error)
}

/// Seal an envelope off the async runtime.
pub async fn seal(
    file: OutboundFile,
    algorithm: SignatureAlgorithm,
    private_key: EncodedPrivateKey,
) -> Result<TransferEnvelope, TransferError> {
    let envelope = tokio::task::spawn_blocking(move || {
        TransferEnvelope::seal(&file, algorithm, &private_key)
    })
    .await
    .map_err(join_error)??;
    Ok(envelope)
}

/// Verify a session against `public_key`, or the envelope's own key when `None`.
pub async fn verify_session(
    session: &mut TransferSession,
    public_key: Option<EncodedBytes>,
) -> Result<VerificationResult, TransferError> {
    let envelope = session.envelope();
    let result = verify(
        envelope.algorithm,
        public_key.unwrap_or_else(|| envelope.public_key.clone()),
        envelope.signature.clone(),
        session.shared_bytes(),
    )
    .await?;
    session.record(&result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_and_verify_off_runtime() {
        let pair = generate_key_pair(KeyParams::ed25519()).await.unwrap();
        let message = Bytes::from_static(b"hello world");

        let signature = sign(pair.algorithm(), pair.private_key().clone(), message.clone())
            .await
            .unwrap();
        let result = verify(pair.algorithm(), pair.public_key().clone(), signature, message)
            .await
            .unwrap();
        assert_eq!(result, VerificationResult::Valid);
    }

    #[tokio::test]
    async fn test_generate_rejects_bad_params() {
        let err = generate_key_pair(KeyParams::rsa(512)).await.unwrap_err();
        assert!(matches!(
            err,
            TransferError::Crypto(sft_crypto::CryptoError::KeyGeneration(_))
        ));
    }

    #[tokio::test]
    async fn test_seal_then_verify_session() {
        let pair = generate_key_pair(KeyParams::ed25519()).await.unwrap();
        let file = OutboundFile::new("x.bin", "", vec![1, 2, 3]);
        let envelope = seal(file, pair.algorithm(), pair.private_key().clone())
            .await
            .unwrap();

        let mut session = TransferSession::open(envelope).unwrap();
        let result = verify_session(&mut session, None).await.unwrap();
        assert_eq!(result, VerificationResult::Valid);
        assert!(session.is_verified());

        let other = generate_key_pair(KeyParams::ed25519()).await.unwrap();
        let result = verify_session(&mut session, Some(other.public_key().clone()))
            .await
            .unwrap();
        assert_eq!(result, VerificationResult::Invalid);
        assert!(!session.is_verified());
    }
}
