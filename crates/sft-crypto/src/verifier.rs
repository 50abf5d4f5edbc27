//! Detached signature verification.

use std::fmt;

use crate::codec::EncodedBytes;
use crate::error::CryptoError;
use crate::scheme::{self, SignatureAlgorithm};

/// Outcome of a verification.
///
/// `Invalid` is the expected result for tampered files or mismatched keys;
/// `Error` means the inputs were malformed and nothing could be checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    Valid,
    Invalid,
    Error(CryptoError),
}

impl VerificationResult {
    /// True only for `Valid`. This is the single source of "authentic".
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationResult::Valid)
    }

    pub fn error(&self) -> Option<&CryptoError> {
        match self {
            VerificationResult::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Short machine-readable label: `valid`, `invalid` or `error`.
    pub fn label(&self) -> &'static str {
        match self {
            VerificationResult::Valid => "valid",
            VerificationResult::Invalid => "invalid",
            VerificationResult::Error(_) => "error",
        }
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationResult::Valid => f.write_str("signature is valid"),
            VerificationResult::Invalid => f.write_str("signature is INVALID"),
            VerificationResult::Error(e) => write!(f, "verification error: {e}"),
        }
    }
}

/// Check `signature` over exactly `message` against `public_key`.
///
/// Pure: identical inputs always give identical results.
pub fn verify(
    algorithm: SignatureAlgorithm,
    public_key: &EncodedBytes,
    signature: &EncodedBytes,
    message: &[u8],
) -> VerificationResult {
    let spki = match public_key.decode() {
        Ok(bytes) => bytes,
        Err(e) => return VerificationResult::Error(CryptoError::InvalidKeyFormat(format!("public key: {e}"))),
    };
    let signature = match signature.decode() {
        Ok(bytes) => bytes,
        Err(e) => {
            return VerificationResult::Error(CryptoError::InvalidSignatureFormat(format!(
                "signature: {e}"
            )))
        }
    };

    let result = match scheme::verify(algorithm, &spki, &signature, message) {
        Ok(true) => VerificationResult::Valid,
        Ok(false) => VerificationResult::Invalid,
        Err(e) => VerificationResult::Error(e),
    };

    tracing::debug!(
        %algorithm,
        message_len = message.len(),
        outcome = result.label(),
        "verified signature"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::keys::{KeyManager, KeyParams};
    use crate::signer::sign;

    #[test]
    fn test_valid_signature() {
        let pair = KeyManager::new(KeyParams::ed25519()).generate().unwrap();
        let sig = sign(pair.algorithm(), pair.private_key(), b"hello world").unwrap();
        let result = verify(pair.algorithm(), pair.public_key(), &sig, b"hello world");
        assert_eq!(result, VerificationResult::Valid);
        assert!(result.is_valid());
    }

    #[test]
    fn test_tampered_message_is_invalid() {
        let pair = KeyManager::new(KeyParams::ed25519()).generate().unwrap();
        let sig = sign(pair.algorithm(), pair.private_key(), b"hello world").unwrap();
        let result = verify(pair.algorithm(), pair.public_key(), &sig, b"hello worle");
        assert_eq!(result, VerificationResult::Invalid);
        assert!(result.error().is_none());
    }

    #[test]
    fn test_garbage_public_key_is_error_not_invalid() {
        let pair = KeyManager::new(KeyParams::ed25519()).generate().unwrap();
        let sig = sign(pair.algorithm(), pair.private_key(), b"m").unwrap();

        let not_base64 = verify(pair.algorithm(), &EncodedBytes::new("!!"), &sig, b"m");
        assert!(matches!(not_base64, VerificationResult::Error(CryptoError::InvalidKeyFormat(_))));

        let not_spki = verify(pair.algorithm(), &encode(b"garbage"), &sig, b"m");
        assert!(matches!(not_spki, VerificationResult::Error(CryptoError::InvalidKeyFormat(_))));
    }

    #[test]
    fn test_undecodable_signature() {
        let pair = KeyManager::new(KeyParams::ed25519()).generate().unwrap();
        let result = verify(pair.algorithm(), pair.public_key(), &EncodedBytes::new("@@@@"), b"m");
        assert!(matches!(result, VerificationResult::Error(CryptoError::InvalidSignatureFormat(_))));
    }

    #[test]
    fn test_algorithm_mismatch_is_key_format_error() {
        let pair = KeyManager::new(KeyParams::ed25519()).generate().unwrap();
        let sig = sign(pair.algorithm(), pair.private_key(), b"m").unwrap();
        let result = verify(SignatureAlgorithm::RsaPkcs1v15Sha256, pair.public_key(), &sig, b"m");
        assert!(matches!(result, VerificationResult::Error(CryptoError::InvalidKeyFormat(_))));
    }

    #[test]
    fn test_repeated_verification_is_stable() {
        let pair = KeyManager::new(KeyParams::ed25519()).generate().unwrap();
        let sig = sign(pair.algorithm(), pair.private_key(), b"m").unwrap();
        let first = verify(pair.algorithm(), pair.public_key(), &sig, b"m");
        for _ in 0..5 {
            assert_eq!(verify(pair.algorithm(), pair.public_key(), &sig, b"m"), first);
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(VerificationResult::Valid.label(), "valid");
        assert_eq!(VerificationResult::Invalid.label(), "invalid");
        assert_eq!(
            VerificationResult::Error(CryptoError::InvalidKeyFormat("x".into())).label(),
            "error"
        );
    }
}
