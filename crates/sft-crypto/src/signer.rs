//! Detached signatures over raw file bytes.

use crate::codec::{self, EncodedBytes};
use crate::error::CryptoError;
use crate::keys::EncodedPrivateKey;
use crate::scheme::{self, SignatureAlgorithm};

/// Sign `message` exactly as given, returning the encoded signature.
///
/// Fails with `InvalidKeyFormat` when `private_key` is not a base64 PKCS#8
/// key for `algorithm`, and with `Signing` on any other crypto failure.
pub fn sign(
    algorithm: SignatureAlgorithm,
    private_key: &EncodedPrivateKey,
    message: &[u8],
) -> Result<EncodedBytes, CryptoError> {
    let der = private_key.decode_der()?;
    let signature = scheme::sign(algorithm, &der, message)?;

    tracing::debug!(
        %algorithm,
        message_len = message.len(),
        signature_len = signature.len(),
        "signed message"
    );

    Ok(codec::encode(&signature))
}
