//! Ed25519 signatures over the raw message.

use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey, SECRET_KEY_LENGTH};
use zeroize::Zeroizing;

use super::{probe_entropy, DerKeyPair};
use crate::error::CryptoError;

pub(crate) fn generate() -> Result<DerKeyPair, CryptoError> {
    probe_entropy()?;

    let mut seed = Zeroizing::new([0u8; SECRET_KEY_LENGTH]);
    getrandom::getrandom(&mut seed[..])
        .map_err(|e| CryptoError::KeyGeneration(format!("entropy source unavailable: {e}")))?;
    let signing_key = SigningKey::from_bytes(&seed);

    let private_pkcs8 = signing_key
        .to_pkcs8_der()
        .map_err(|e| CryptoError::KeyGeneration(format!("PKCS#8 export failed: {e}")))?;
    let public_spki = signing_key
        .verifying_key()
        .to_public_key_der()
        .map_err(|e| CryptoError::KeyGeneration(format!("SPKI export failed: {e}")))?;

    Ok(DerKeyPair {
        public_spki: public_spki.as_bytes().to_vec(),
        private_pkcs8: Zeroizing::new(private_pkcs8.as_bytes().to_vec()),
    })
}

fn decode_private(private_pkcs8: &[u8]) -> Result<SigningKey, CryptoError> {
    SigningKey::from_pkcs8_der(private_pkcs8).map_err(|e| {
        CryptoError::InvalidKeyFormat(format!("not an Ed25519 PKCS#8 private key: {e}"))
    })
}

pub(crate) fn sign(private_pkcs8: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let signing_key = decode_private(private_pkcs8)?;
    let signature: Signature = signing_key
        .try_sign(message)
        .map_err(|e| CryptoError::Signing(e.to_string()))?;
    Ok(signature.to_bytes().to_vec())
}

pub(crate) fn verify(
    public_spki: &[u8],
    signature: &[u8],
    message: &[u8],
) -> Result<bool, CryptoError> {
    let verifying_key = VerifyingKey::from_public_key_der(public_spki).map_err(|e| {
        CryptoError::InvalidKeyFormat(format!("not an Ed25519 SPKI public key: {e}"))
    })?;

    // Only 64-byte signatures exist; anything else simply does not verify.
    let Ok(signature) = Signature::from_slice(signature) else {
        return Ok(false);
    };

    Ok(verifying_key.verify_strict(message, &signature).is_ok())
}

pub(crate) fn public_from_private(private_pkcs8: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let spki = decode_private(private_pkcs8)?
        .verifying_key()
        .to_public_key_der()
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("SPKI export failed: {e}")))?;
    Ok(spki.as_bytes().to_vec())
}
