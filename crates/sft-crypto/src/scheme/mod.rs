//! Signature algorithm schemes.
//!
//! Each scheme works on DER: SubjectPublicKeyInfo for public keys and
//! PKCS#8 for private keys. Text encoding is the caller's concern.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

pub(crate) mod ed25519;
pub(crate) mod rsa_pkcs1;

/// Default RSA modulus length, matching the browser client.
pub const DEFAULT_RSA_MODULUS_BITS: usize = 2048;

/// RSA modulus lengths accepted for key generation.
pub const SUPPORTED_RSA_MODULUS_BITS: [usize; 3] = [2048, 3072, 4096];

/// Signature algorithm carried in every envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SignatureAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    #[default]
    RsaPkcs1v15Sha256,
    /// Ed25519 (RFC 8032), strict verification.
    Ed25519,
}

impl SignatureAlgorithm {
    pub const ALL: [SignatureAlgorithm; 2] =
        [SignatureAlgorithm::RsaPkcs1v15Sha256, SignatureAlgorithm::Ed25519];

    /// Name used on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            SignatureAlgorithm::RsaPkcs1v15Sha256 => "RSASSA-PKCS1-v1_5-SHA256",
            SignatureAlgorithm::Ed25519 => "Ed25519",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = CryptoError;

    /// Accepts the wire names plus the short CLI spellings `rsa` and `ed25519`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RSASSA-PKCS1-v1_5-SHA256" => Ok(Self::RsaPkcs1v15Sha256),
            "Ed25519" => Ok(Self::Ed25519),
            other => match other.to_ascii_lowercase().as_str() {
                "rsa" | "rsa-pkcs1v15-sha256" => Ok(Self::RsaPkcs1v15Sha256),
                "ed25519" => Ok(Self::Ed25519),
                _ => Err(CryptoError::UnsupportedAlgorithm(s.to_string())),
            },
        }
    }
}

impl TryFrom<String> for SignatureAlgorithm {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SignatureAlgorithm> for String {
    fn from(value: SignatureAlgorithm) -> Self {
        value.wire_name().to_string()
    }
}

/// DER encodings of a freshly generated key pair.
pub(crate) struct DerKeyPair {
    pub public_spki: Vec<u8>,
    pub private_pkcs8: zeroize::Zeroizing<Vec<u8>>,
}

pub(crate) fn generate(
    algorithm: SignatureAlgorithm,
    rsa_modulus_bits: usize,
) -> Result<DerKeyPair, CryptoError> {
    match algorithm {
        SignatureAlgorithm::RsaPkcs1v15Sha256 => rsa_pkcs1::generate(rsa_modulus_bits),
        SignatureAlgorithm::Ed25519 => ed25519::generate(),
    }
}

pub(crate) fn sign(
    algorithm: SignatureAlgorithm,
    private_pkcs8: &[u8],
    message: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    match algorithm {
        SignatureAlgorithm::RsaPkcs1v15Sha256 => rsa_pkcs1::sign(private_pkcs8, message),
        SignatureAlgorithm::Ed25519 => ed25519::sign(private_pkcs8, message),
    }
}

/// `Ok(true)` valid, `Ok(false)` cryptographic mismatch, `Err` malformed input.
pub(crate) fn verify(
    algorithm: SignatureAlgorithm,
    public_spki: &[u8],
    signature: &[u8],
    message: &[u8],
) -> Result<bool, CryptoError> {
    match algorithm {
        SignatureAlgorithm::RsaPkcs1v15Sha256 => rsa_pkcs1::verify(public_spki, signature, message),
        SignatureAlgorithm::Ed25519 => ed25519::verify(public_spki, signature, message),
    }
}

pub(crate) fn public_from_private(
    algorithm: SignatureAlgorithm,
    private_pkcs8: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    match algorithm {
        SignatureAlgorithm::RsaPkcs1v15Sha256 => rsa_pkcs1::public_from_private(private_pkcs8),
        SignatureAlgorithm::Ed25519 => ed25519::public_from_private(private_pkcs8),
    }
}

/// Fail with `KeyGeneration` when the OS entropy source cannot be read.
pub(crate) fn probe_entropy() -> Result<(), CryptoError> {
    let mut probe = [0u8; 16];
    getrandom::getrandom(&mut probe)
        .map_err(|e| CryptoError::KeyGeneration(format!("entropy source unavailable: {e}")))
}
