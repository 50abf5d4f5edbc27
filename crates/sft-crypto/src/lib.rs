//! sft-crypto: the signing protocol core.
//!
//! - [`codec`]: binary to text-safe (base64) encoding
//! - [`keys`]: key pair generation, SPKI / PKCS#8 export
//! - [`signer`]: detached signatures over raw bytes
//! - [`verifier`]: tri-state signature verification
//! - [`scheme`]: supported signature algorithms

#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod hash;
pub mod keys;
pub mod scheme;
pub mod signer;
pub mod verifier;

#[cfg(test)]
mod proptests;

pub use codec::{decode, encode, EncodedBytes};
pub use error::CryptoError;
pub use keys::{generate_key_pair, public_key_from_private, EncodedPrivateKey, KeyManager, KeyPair, KeyParams};
pub use scheme::SignatureAlgorithm;
pub use signer::sign;
pub use verifier::{verify, VerificationResult};
