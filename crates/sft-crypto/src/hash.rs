use sha2::{Digest, Sha256};

use crate::codec::EncodedBytes;
use crate::error::CryptoError;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(data);
    h.finalize().into()
}

/// Display fingerprint of a public key: lowercase hex SHA-256 of its SPKI DER.
///
/// For out-of-band comparison by humans only; it carries no trust.
pub fn fingerprint(public_key: &EncodedBytes) -> Result<String, CryptoError> {
    let spki = public_key
        .decode()
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("public key: {e}")))?;
    Ok(hex::encode(sha256(&spki)))
}

/// First 8 bytes of the fingerprint, grouped for reading aloud.
pub fn short_fingerprint(public_key: &EncodedBytes) -> Result<String, CryptoError> {
    let full = fingerprint(public_key)?;
    Ok(full.as_bytes()[..16]
        .chunks(4)
        .map(|c| std::str::from_utf8(c).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(":"))
}
