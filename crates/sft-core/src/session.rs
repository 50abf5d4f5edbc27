//! Receiver side of one transfer.
//!
//! A [`TransferSession`] is created per received envelope and owns the
//! decoded file. Nothing about the file is trusted until a verification
//! returns [`VerificationResult::Valid`]; the session tracks that through
//! [`Authenticity`] so a renderer can tell verified and unverified content
//! apart.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use sft_crypto::{hash, verify, CryptoError, EncodedBytes, SignatureAlgorithm, VerificationResult};
use tracing::{debug, info};

use crate::envelope::TransferEnvelope;
use crate::errors::TransferError;

/// Why a file was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Well-formed input, failed cryptographic check.
    SignatureMismatch,
    /// Malformed key or signature.
    Malformed(CryptoError),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::SignatureMismatch => f.write_str("signature does not match file and key"),
            Rejection::Malformed(e) => write!(f, "{e}"),
        }
    }
}

/// Trust state of the received file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Authenticity {
    #[default]
    Unverified,
    Verified,
    Rejected(Rejection),
}

impl Authenticity {
    pub fn is_verified(&self) -> bool {
        matches!(self, Authenticity::Verified)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Authenticity::Unverified => "unverified",
            Authenticity::Verified => "verified",
            Authenticity::Rejected(_) => "rejected",
        }
    }
}

impl From<&VerificationResult> for Authenticity {
    fn from(result: &VerificationResult) -> Self {
        match result {
            VerificationResult::Valid => Authenticity::Verified,
            VerificationResult::Invalid => Authenticity::Rejected(Rejection::SignatureMismatch),
            VerificationResult::Error(e) => Authenticity::Rejected(Rejection::Malformed(e.clone())),
        }
    }
}

impl fmt::Display for Authenticity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authenticity::Rejected(reason) => write!(f, "rejected: {reason}"),
            other => f.write_str(other.label()),
        }
    }
}

/// What a renderer gets: the decoded file plus its trust state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview<'a> {
    pub file_name: &'a str,
    pub media_type: &'a str,
    pub bytes: &'a [u8],
    /// The declared media type is an image type. Says nothing about the bytes.
    pub is_image: bool,
    pub authenticity: Authenticity,
}

/// One received transfer.
#[derive(Debug, Clone)]
pub struct TransferSession {
    envelope: TransferEnvelope,
    bytes: Bytes,
    authenticity: Authenticity,
}

impl TransferSession {
    /// Validate the envelope and decode its file.
    ///
    /// Fails closed: an envelope whose file data does not decode never
    /// produces a session.
    pub fn open(envelope: TransferEnvelope) -> Result<Self, TransferError> {
        envelope.validate()?;
        let bytes = envelope.file_data.decode()?;

        debug!(
            file_name = %envelope.file_name,
            size = bytes.len(),
            algorithm = %envelope.algorithm,
            "opened transfer"
        );

        Ok(Self {
            envelope,
            bytes: Bytes::from(bytes),
            authenticity: Authenticity::Unverified,
        })
    }

    pub fn envelope(&self) -> &TransferEnvelope {
        &self.envelope
    }

    pub fn file_name(&self) -> &str {
        &self.envelope.file_name
    }

    pub fn media_type(&self) -> &str {
        &self.envelope.file_type
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.envelope.algorithm
    }

    /// The public key the sender attached. Self-asserted.
    pub fn sender_public_key(&self) -> &EncodedBytes {
        &self.envelope.public_key
    }

    /// Hex SHA-256 of the sender's key, for out-of-band comparison.
    pub fn sender_fingerprint(&self) -> Result<String, CryptoError> {
        hash::fingerprint(&self.envelope.public_key)
    }

    /// Decoded file bytes. Not authenticated unless [`Self::authenticity`] says so.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn shared_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn authenticity(&self) -> &Authenticity {
        &self.authenticity
    }

    pub fn is_verified(&self) -> bool {
        self.authenticity.is_verified()
    }

    /// Verify against the public key carried in the envelope.
    pub fn verify(&mut self) -> VerificationResult {
        let key = self.envelope.public_key.clone();
        self.verify_with_key(&key)
    }

    /// Verify against a key obtained some other way.
    pub fn verify_with_key(&mut self, public_key: &EncodedBytes) -> VerificationResult {
        let result = verify(
            self.envelope.algorithm,
            public_key,
            &self.envelope.signature,
            &self.bytes,
        );
        self.record(&result);
        result
    }

    /// Store the outcome of a verification run elsewhere.
    pub(crate) fn record(&mut self, result: &VerificationResult) {
        self.authenticity = Authenticity::from(result);
        info!(
            file_name = %self.envelope.file_name,
            outcome = result.label(),
            "verification finished"
        );
    }

    pub fn preview(&self) -> Preview<'_> {
        Preview {
            file_name: &self.envelope.file_name,
            media_type: &self.envelope.file_type,
            bytes: &self.bytes,
            is_image: self.envelope.file_type.starts_with("image/"),
            authenticity: self.authenticity.clone(),
        }
    }

    /// Write the decoded file into `dir` under its envelope name.
    ///
    /// An existing file is never overwritten; a ` (n)` suffix is added
    /// instead. Returns the path written. Saving says nothing about
    /// authenticity.
    pub async fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, TransferError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| TransferError::io(dir, e))?;

        let mut attempt = 0u32;
        loop {
            let path = dir.join(numbered_name(&self.envelope.file_name, attempt));
            match write_new(&path, &self.bytes).await {
                Ok(()) => {
                    debug!(path = %path.display(), size = self.bytes.len(), "saved transfer");
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                    attempt += 1;
                }
                Err(e) => return Err(TransferError::io(path, e)),
            }
        }
    }

    pub fn into_envelope(self) -> TransferEnvelope {
        self.envelope
    }
}

const MAX_NAME_ATTEMPTS: u32 = 1000;

async fn write_new(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await
}

/// `report.pdf`, `report (1).pdf`, `report (2).pdf`, ...
fn numbered_name(name: &str, n: u32) -> String {
    if n == 0 {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{} ({n}){}", &name[..dot], &name[dot..]),
        _ => format!("{name} ({n})"),
    }
}
