//! Key pair generation and handling of encoded key material.
//!
//! Public keys are exported as SubjectPublicKeyInfo DER and private keys as
//! PKCS#8 DER, both base64 encoded, so they can be imported by any other
//! conforming implementation (WebCrypto `spki`/`pkcs8`, OpenSSL, ...).
//! Private key text lives in a buffer that is zeroized on drop.

use std::fmt;

use zeroize::Zeroizing;

use crate::codec::{self, EncodedBytes};
use crate::error::CryptoError;
use crate::scheme::{self, SignatureAlgorithm, DEFAULT_RSA_MODULUS_BITS, SUPPORTED_RSA_MODULUS_BITS};

/// Base64 PKCS#8 private key. Zeroized on drop, redacted in `Debug`.
#[derive(Clone)]
pub struct EncodedPrivateKey(Zeroizing<String>);

impl EncodedPrivateKey {
    pub fn new(text: impl Into<String>) -> Self {
        Self(Zeroizing::new(text.into()))
    }

    /// The encoded key text. Callers must not log it.
    pub fn expose_secret(&self) -> &str {
        self.0.as_str()
    }

    pub(crate) fn decode_der(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        codec::decode_str(self.expose_secret())
            .map(Zeroizing::new)
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("private key: {e}")))
    }
}

impl fmt::Debug for EncodedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncodedPrivateKey(<redacted>)")
    }
}

/// Parameters for key generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyParams {
    pub algorithm: SignatureAlgorithm,
    /// Only used for RSA.
    pub rsa_modulus_bits: usize,
}

impl Default for KeyParams {
    fn default() -> Self {
        Self {
            algorithm: SignatureAlgorithm::RsaPkcs1v15Sha256,
            rsa_modulus_bits: DEFAULT_RSA_MODULUS_BITS,
        }
    }
}

impl KeyParams {
    pub fn rsa(modulus_bits: usize) -> Self {
        Self {
            algorithm: SignatureAlgorithm::RsaPkcs1v15Sha256,
            rsa_modulus_bits: modulus_bits,
        }
    }

    pub fn ed25519() -> Self {
        Self {
            algorithm: SignatureAlgorithm::Ed25519,
            ..Self::default()
        }
    }

    /// Reject parameters the key manager cannot honour.
    pub fn validate(&self) -> Result<(), CryptoError> {
        if self.algorithm == SignatureAlgorithm::RsaPkcs1v15Sha256
            && !SUPPORTED_RSA_MODULUS_BITS.contains(&self.rsa_modulus_bits)
        {
            return Err(CryptoError::KeyGeneration(format!(
                "unsupported RSA modulus length {}, expected one of {:?}",
                self.rsa_modulus_bits, SUPPORTED_RSA_MODULUS_BITS
            )));
        }
        Ok(())
    }
}

/// A linked public/private key pair, held in memory only.
#[derive(Debug, Clone)]
pub struct KeyPair {
    algorithm: SignatureAlgorithm,
    public_key: EncodedBytes,
    private_key: EncodedPrivateKey,
}

impl KeyPair {
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Base64 SPKI public key.
    pub fn public_key(&self) -> &EncodedBytes {
        &self.public_key
    }

    /// Base64 PKCS#8 private key.
    pub fn private_key(&self) -> &EncodedPrivateKey {
        &self.private_key
    }

    /// Split into the public and private halves.
    pub fn into_parts(self) -> (EncodedBytes, EncodedPrivateKey) {
        (self.public_key, self.private_key)
    }
}

/// Generates fresh key pairs from the OS entropy source.
#[derive(Debug, Clone, Default)]
pub struct KeyManager {
    params: KeyParams,
}

impl KeyManager {
    pub fn new(params: KeyParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &KeyParams {
        &self.params
    }

    /// Generate an independent key pair. CPU-heavy for RSA.
    pub fn generate(&self) -> Result<KeyPair, CryptoError> {
        generate_key_pair(self.params)
    }
}

/// Generate a key pair with the given parameters.
pub fn generate_key_pair(params: KeyParams) -> Result<KeyPair, CryptoError> {
    params.validate()?;
    let der = scheme::generate(params.algorithm, params.rsa_modulus_bits)?;

    tracing::debug!(
        algorithm = %params.algorithm,
        public_key_len = der.public_spki.len(),
        "generated key pair"
    );

    Ok(KeyPair {
        algorithm: params.algorithm,
        public_key: codec::encode(&der.public_spki),
        private_key: EncodedPrivateKey(Zeroizing::new(codec::encode(&der.private_pkcs8).into_string())),
    })
}

/// Re-derive the public key belonging to `private_key`.
pub fn public_key_from_private(
    algorithm: SignatureAlgorithm,
    private_key: &EncodedPrivateKey,
) -> Result<EncodedBytes, CryptoError> {
    let der = private_key.decode_der()?;
    let spki = scheme::public_from_private(algorithm, &der)?;
    Ok(codec::encode(&spki))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ed25519_pairs_are_independent() {
        let manager = KeyManager::new(KeyParams::ed25519());
        let a = manager.generate().unwrap();
        let b = manager.generate().unwrap();
        assert_ne!(a.public_key(), b.public_key());
        assert_ne!(a.private_key().expose_secret(), b.private_key().expose_secret());
    }

    #[test]
    fn test_rsa_pair_exports_der() {
        let pair = generate_key_pair(KeyParams::default()).unwrap();
        assert_eq!(pair.algorithm(), SignatureAlgorithm::RsaPkcs1v15Sha256);

        // Both encodings are DER SEQUENCEs.
        let spki = pair.public_key().decode().unwrap();
        let pkcs8 = pair.private_key().decode_der().unwrap();
        assert_eq!(spki[0], 0x30);
        assert_eq!(pkcs8[0], 0x30);
        // 2048-bit SPKI is 294 bytes.
        assert_eq!(spki.len(), 294);
    }

    #[test]
    fn test_unsupported_modulus_is_key_generation_error() {
        for bits in [1000, 1024, 2047] {
            let err = generate_key_pair(KeyParams::rsa(bits)).unwrap_err();
            assert!(matches!(err, CryptoError::KeyGeneration(_)));
        }
    }

    #[test]
    fn test_ed25519_ignores_modulus() {
        let params = KeyParams {
            algorithm: SignatureAlgorithm::Ed25519,
            rsa_modulus_bits: 7,
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_private_key_debug_redacted() {
        let pair = KeyManager::new(KeyParams::ed25519()).generate().unwrap();
        let dbg = format!("{pair:?}");
        assert!(dbg.contains("<redacted>"));
        assert!(!dbg.contains(pair.private_key().expose_secret()));
    }

    #[test]
    fn test_public_key_from_private() {
        let pair = KeyManager::new(KeyParams::ed25519()).generate().unwrap();
        let derived = public_key_from_private(pair.algorithm(), pair.private_key()).unwrap();
        assert_eq!(&derived, pair.public_key());
    }

    #[test]
    fn test_public_key_from_garbage_private() {
        let err = public_key_from_private(
            SignatureAlgorithm::Ed25519,
            &EncodedPrivateKey::new("%%%"),
        )
        .unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKeyFormat(_)));
    }
}
