//! Outbound files: raw bytes plus the name and media type that travel with them.

use std::fmt;
use std::path::Path;

use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::errors::TransferError;

/// Default outbound size limit (64 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// A file ready to be signed.
#[derive(Clone, PartialEq, Eq)]
pub struct OutboundFile {
    pub name: String,
    /// Media type label, empty when unknown.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl OutboundFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a whole file from disk.
    ///
    /// The file is read to completion before this returns, and the limit is
    /// enforced both on the reported size and on the bytes actually read.
    pub async fn read(path: impl AsRef<Path>, max_size: u64) -> Result<Self, TransferError> {
        let path = path.as_ref();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| TransferError::io(path, e))?;
        if !metadata.is_file() {
            return Err(TransferError::NotAFile(path.to_path_buf()));
        }
        if metadata.len() > max_size {
            return Err(TransferError::FileTooLarge {
                size: metadata.len(),
                limit: max_size,
            });
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TransferError::NotAFile(path.to_path_buf()))?
            .to_string();

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| TransferError::io(path, e))?;
        let mut bytes = Vec::with_capacity(metadata.len() as usize);
        // One byte past the limit is enough to notice growth.
        file.take(max_size.saturating_add(1))
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| TransferError::io(path, e))?;
        if bytes.len() as u64 > max_size {
            return Err(TransferError::FileTooLarge {
                size: bytes.len() as u64,
                limit: max_size,
            });
        }

        let media_type = guess_media_type(&name);
        debug!(file_name = %name, size = bytes.len(), media_type = %media_type, "read outbound file");

        Ok(Self {
            name,
            media_type,
            bytes,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for OutboundFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Media type for a file name, or `""` when the extension is unknown.
pub fn guess_media_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_default()
}
