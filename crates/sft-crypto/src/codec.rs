//! Binary to text-safe encoding for payloads carried in JSON messages.
//!
//! Standard base64 (RFC 4648, `=` padded). Decoding is strict: embedded
//! whitespace, non-canonical padding and non-zero trailing bits are all
//! rejected, so every accepted string is the exact output of [`encode`].

use std::fmt;

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Text-safe representation of an arbitrary byte sequence.
///
/// Constructing one from a `String` does not validate it; validation happens
/// on [`EncodedBytes::decode`], which is the only way back to bytes.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedBytes(String);

impl EncodedBytes {
    /// Wrap text received from the wire or a file.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode back to the original bytes.
    pub fn decode(&self) -> Result<Vec<u8>, CryptoError> {
        decode(self)
    }
}

impl From<String> for EncodedBytes {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for EncodedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EncodedBytes {
    // File payloads can be megabytes; keep debug output readable.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 16;
        // Unvalidated input may hold non-ASCII text; cut on a char boundary.
        match self.0.char_indices().nth(PREVIEW) {
            None => write!(f, "EncodedBytes({:?})", self.0),
            Some((cut, _)) => write!(
                f,
                "EncodedBytes({:?}.. {} bytes)",
                &self.0[..cut],
                self.0.len()
            ),
        }
    }
}

/// Encode bytes. Total and deterministic.
pub fn encode(bytes: &[u8]) -> EncodedBytes {
    EncodedBytes(B64.encode(bytes))
}

/// Decode text produced by [`encode`].
pub fn decode(text: &EncodedBytes) -> Result<Vec<u8>, CryptoError> {
    decode_str(text.as_str())
}

/// Decode a borrowed string without wrapping it first.
pub fn decode_str(text: &str) -> Result<Vec<u8>, CryptoError> {
    B64.decode(text)
        .map_err(|e| CryptoError::MalformedEncoding(e.to_string()))
}

/// Length of `encode(b)` for any `b` with `b.len() == input_len`.
pub fn encoded_len(input_len: usize) -> usize {
    // 4 * ceil(n / 3); saturates instead of overflowing on absurd inputs.
    input_len
        .div_ceil(3)
        .saturating_mul(4)
}
