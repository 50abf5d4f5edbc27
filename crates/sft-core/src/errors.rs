//! Error types for envelope handling and transfers.

use std::path::PathBuf;

use sft_crypto::CryptoError;
use sft_transport::TransportError;
use thiserror::Error;

/// Envelope schema and validation errors.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("file name must not be empty")]
    EmptyFileName,

    /// The name carries a separator or a relative component.
    #[error("file name must be a plain name, not a path: {0:?}")]
    PathInFileName(String),

    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Errors raised while preparing, moving or consuming one transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("file too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("background task failed: {0}")]
    Task(String),
}

impl TransferError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The crypto failure behind this error, looking through envelope errors.
    pub fn crypto(&self) -> Option<&CryptoError> {
        match self {
            TransferError::Crypto(e) | TransferError::Envelope(EnvelopeError::Crypto(e)) => Some(e),
            _ => None,
        }
    }

    /// True when the input itself is bad: malformed encoding, key or
    /// signature format, or an envelope that fails validation.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            TransferError::Crypto(_) | TransferError::Envelope(_) | TransferError::FileTooLarge { .. }
        )
    }
}
