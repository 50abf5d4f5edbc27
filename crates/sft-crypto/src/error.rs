//! Error taxonomy shared by the codec, key manager, signer and verifier.

use thiserror::Error;

/// Typed failures of the signing protocol.
///
/// A failed cryptographic check is not an error: the verifier reports it as
/// [`crate::VerificationResult::Invalid`]. Everything here means the input
/// could not even be checked.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

impl CryptoError {
    /// Stable short name of the failure kind, suitable for machine output.
    pub fn kind(&self) -> &'static str {
        match self {
            CryptoError::MalformedEncoding(_) => "MalformedEncoding",
            CryptoError::InvalidKeyFormat(_) => "InvalidKeyFormat",
            CryptoError::InvalidSignatureFormat(_) => "InvalidSignatureFormat",
            CryptoError::KeyGeneration(_) => "KeyGenerationError",
            CryptoError::Signing(_) => "SigningError",
            CryptoError::UnsupportedAlgorithm(_) => "UnsupportedAlgorithm",
        }
    }
}
