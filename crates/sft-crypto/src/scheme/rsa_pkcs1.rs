//! RSASSA-PKCS1-v1_5 with SHA-256.

use ::rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use ::rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ::rsa::signature::{SignatureEncoding, Signer, Verifier};
use ::rsa::traits::PublicKeyParts;
use ::rsa::{RsaPrivateKey, RsaPublicKey};
use rand_core::OsRng;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::{probe_entropy, DerKeyPair};
use crate::error::CryptoError;

/// Callers validate `modulus_bits` through `KeyParams::validate`.
pub(crate) fn generate(modulus_bits: usize) -> Result<DerKeyPair, CryptoError> {
    probe_entropy()?;

    // Public exponent is fixed at 65537.
    let private = RsaPrivateKey::new(&mut OsRng, modulus_bits)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;

    let private_pkcs8 = private
        .to_pkcs8_der()
        .map_err(|e| CryptoError::KeyGeneration(format!("PKCS#8 export failed: {e}")))?;
    let public_spki = private
        .to_public_key()
        .to_public_key_der()
        .map_err(|e| CryptoError::KeyGeneration(format!("SPKI export failed: {e}")))?;

    Ok(DerKeyPair {
        public_spki: public_spki.as_bytes().to_vec(),
        private_pkcs8: Zeroizing::new(private_pkcs8.as_bytes().to_vec()),
    })
}

fn decode_private(private_pkcs8: &[u8]) -> Result<RsaPrivateKey, CryptoError> {
    RsaPrivateKey::from_pkcs8_der(private_pkcs8)
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("not an RSA PKCS#8 private key: {e}")))
}

fn decode_public(public_spki: &[u8]) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::from_public_key_der(public_spki)
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("not an RSA SPKI public key: {e}")))
}

pub(crate) fn sign(private_pkcs8: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let signing_key = SigningKey::<Sha256>::new(decode_private(private_pkcs8)?);
    let signature = signing_key
        .try_sign(message)
        .map_err(|e| CryptoError::Signing(e.to_string()))?;
    Ok(signature.to_vec())
}

pub(crate) fn verify(
    public_spki: &[u8],
    signature: &[u8],
    message: &[u8],
) -> Result<bool, CryptoError> {
    let public = decode_public(public_spki)?;

    // A PKCS#1 v1.5 signature is exactly as long as the modulus. Any other
    // length cannot verify under this key, e.g. one made by a key of another size.
    if signature.len() != public.size() {
        return Ok(false);
    }
    let Ok(signature) = Signature::try_from(signature) else {
        return Ok(false);
    };

    let verifying_key = VerifyingKey::<Sha256>::new(public);
    Ok(verifying_key.verify(message, &signature).is_ok())
}

pub(crate) fn public_from_private(private_pkcs8: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let public = decode_private(private_pkcs8)?.to_public_key();
    let spki = public
        .to_public_key_der()
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("SPKI export failed: {e}")))?;
    Ok(spki.as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_length_signature_is_mismatch() {
        let pair = generate(2048).unwrap();
        let sig = sign(&pair.private_pkcs8, b"msg").unwrap();
        assert!(verify(&pair.public_spki, &sig, b"msg").unwrap());
        assert!(!verify(&pair.public_spki, &sig[1..], b"msg").unwrap());
        assert!(!verify(&pair.public_spki, &[0u8; 64], b"msg").unwrap());
    }

    #[test]
    fn test_garbage_private_key() {
        let err = sign(b"definitely not der", b"msg").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKeyFormat(_)));
    }

    #[test]
    fn test_garbage_public_key() {
        let err = verify(&[0x30, 0x03, 0x02, 0x01, 0x00], &[0u8; 256], b"msg").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKeyFormat(_)));
    }
}
