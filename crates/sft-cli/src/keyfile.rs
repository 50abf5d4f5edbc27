//! Key files on disk
//!
//! A key file holds one base64 key on a single line: SPKI for public keys,
//! PKCS#8 for private keys. Private key files are created with mode 0600 on
//! Unix and are never overwritten unless asked to.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sft_crypto::{public_key_from_private, CryptoError, EncodedBytes, EncodedPrivateKey, SignatureAlgorithm};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum KeyFileError {
    #[error("Failed to access key file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Key file {} already exists (use --force to replace it)", .0.display())]
    Exists(PathBuf),

    #[error("Key file {} is empty", .0.display())]
    Empty(PathBuf),

    #[error("Invalid key: {0}")]
    Crypto(#[from] CryptoError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> KeyFileError + '_ {
    move |source| KeyFileError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_key_text(path: &Path) -> Result<Zeroizing<String>, KeyFileError> {
    let content = Zeroizing::new(fs::read_to_string(path).map_err(io_error(path))?);
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(KeyFileError::Empty(path.to_path_buf()));
    }
    Ok(Zeroizing::new(trimmed.to_string()))
}

/// Read a base64 SPKI public key. Surrounding whitespace is ignored.
pub fn read_public_key(path: &Path) -> Result<EncodedBytes, KeyFileError> {
    let text = read_key_text(path)?;
    let key = EncodedBytes::new(text.as_str());
    // Reject garbage here rather than at verification time.
    key.decode()
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("public key: {e}")))?;
    Ok(key)
}

/// Read a base64 PKCS#8 private key. Surrounding whitespace is ignored.
pub fn read_private_key(path: &Path) -> Result<EncodedPrivateKey, KeyFileError> {
    let text = read_key_text(path)?;
    Ok(EncodedPrivateKey::new(text.as_str()))
}

/// Work out which algorithm a PKCS#8 private key belongs to.
pub fn infer_algorithm(private_key: &EncodedPrivateKey) -> Result<SignatureAlgorithm, KeyFileError> {
    SignatureAlgorithm::ALL
        .into_iter()
        .find(|alg| public_key_from_private(*alg, private_key).is_ok())
        .ok_or_else(|| {
            CryptoError::InvalidKeyFormat("private key matches no supported algorithm".to_string())
                .into()
        })
}

/// Write a private key, readable by the owner only.
pub fn write_private_key(path: &Path, key: &EncodedPrivateKey, force: bool) -> Result<(), KeyFileError> {
    let mut options = fs::OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            KeyFileError::Exists(path.to_path_buf())
        } else {
            io_error(path)(e)
        }
    })?;

    // `mode` only applies on creation.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(io_error(path))?;
    }

    file.write_all(key.expose_secret().as_bytes())
        .and_then(|_| file.write_all(b"\n"))
        .map_err(io_error(path))
}

/// Write a public key.
pub fn write_public_key(path: &Path, key: &EncodedBytes, force: bool) -> Result<(), KeyFileError> {
    if !force && path.exists() {
        return Err(KeyFileError::Exists(path.to_path_buf()));
    }
    fs::write(path, format!("{key}\n")).map_err(io_error(path))
}

/// `<private>.pub`
pub fn default_public_path(private_path: &Path) -> PathBuf {
    let mut name = private_path.as_os_str().to_os_string();
    name.push(".pub");
    PathBuf::from(name)
}
