//! The signed-file message exchanged between sender and receiver.
//!
//! JSON shape:
//!
//! ```text
//! {
//!   "fileName":  "report.pdf",
//!   "fileData":  "<base64 file bytes>",
//!   "signature": "<base64 detached signature>",
//!   "publicKey": "<base64 SPKI DER>",
//!   "fileType":  "application/pdf",
//!   "algorithm": "RSASSA-PKCS1-v1_5-SHA256"
//! }
//! ```
//!
//! `algorithm` is always written. Messages without it are read as
//! RSASSA-PKCS1-v1_5 with SHA-256, which is what clients that predate the
//! field sign with.

use serde::{Deserialize, Serialize};
use sft_crypto::{
    encode, public_key_from_private, sign, EncodedBytes, EncodedPrivateKey, KeyPair,
    SignatureAlgorithm,
};
use tracing::debug;

use crate::errors::EnvelopeError;
use crate::source::OutboundFile;

/// One self-contained signed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEnvelope {
    pub file_name: String,
    pub file_data: EncodedBytes,
    pub signature: EncodedBytes,
    pub public_key: EncodedBytes,
    /// Media type label, possibly empty. Never used for verification.
    pub file_type: String,
    #[serde(default)]
    pub algorithm: SignatureAlgorithm,
}

impl TransferEnvelope {
    /// Sign `file` and bundle it with the matching public key.
    ///
    /// The public key is derived from `private_key`, so the envelope can
    /// never carry a key that does not belong to the signature.
    pub fn seal(
        file: &OutboundFile,
        algorithm: SignatureAlgorithm,
        private_key: &EncodedPrivateKey,
    ) -> Result<Self, EnvelopeError> {
        validate_file_name(&file.name)?;

        let public_key = public_key_from_private(algorithm, private_key)?;
        let signature = sign(algorithm, private_key, &file.bytes)?;

        debug!(
            file_name = %file.name,
            size = file.bytes.len(),
            %algorithm,
            "sealed envelope"
        );

        Ok(Self {
            file_name: file.name.clone(),
            file_data: encode(&file.bytes),
            signature,
            public_key,
            file_type: file.media_type.clone(),
            algorithm,
        })
    }

    /// [`seal`](Self::seal) with a freshly generated or loaded key pair.
    pub fn seal_with_key_pair(file: &OutboundFile, key_pair: &KeyPair) -> Result<Self, EnvelopeError> {
        Self::seal(file, key_pair.algorithm(), key_pair.private_key())
    }

    /// Check the fields that do not need decoding.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        validate_file_name(&self.file_name)
    }

    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate an envelope.
    pub fn from_json(json: &str) -> Result<Self, EnvelopeError> {
        let envelope: Self = serde_json::from_str(json)?;
        envelope.validate()?;
        Ok(envelope)
    }

    /// Parse and validate an envelope from a raw frame.
    pub fn from_slice(frame: &[u8]) -> Result<Self, EnvelopeError> {
        let envelope: Self = serde_json::from_slice(frame)?;
        envelope.validate()?;
        Ok(envelope)
    }
}

/// A file name is accepted only as a single plain path component.
pub fn validate_file_name(name: &str) -> Result<(), EnvelopeError> {
    if name.is_empty() {
        return Err(EnvelopeError::EmptyFileName);
    }
    if name.contains(['/', '\\', '\0']) || name == "." || name == ".." {
        return Err(EnvelopeError::PathInFileName(name.to_string()));
    }
    Ok(())
}
