//! sft - signed file transfer from the command line
//!
//! This crate provides a command-line interface for:
//! - Generating signing key pairs
//! - Sealing files into signed envelopes and opening them again
//! - Sending and receiving envelopes through a relay
//! - Showing public key fingerprints

pub mod cli;
pub mod config;
pub mod keyfile;
pub mod output;

#[cfg(test)]
mod proptests;

use sft_core::{EnvelopeError, TransferError};
use sft_crypto::CryptoError;
use sft_transport::TransportError;

pub use cli::Cli;
pub use config::{CliOverrides, Config};
pub use output::{JsonResponse, OutputFormat, OutputFormatter};

/// Exit codes for CLI operations
///
/// - 0: Success
/// - 1: General error
/// - 2: Verification failed - the signature does not match
/// - 3: Timeout
/// - 4: Connection failed
/// - 5: Invalid input - malformed encoding, key, signature or envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i32)]
pub enum ExitCode {
    /// Operation completed successfully (exit code 0)
    Success = 0,
    /// General error (exit code 1)
    GeneralError = 1,
    /// Signature did not verify (exit code 2)
    VerificationFailed = 2,
    /// Operation timed out (exit code 3)
    Timeout = 3,
    /// Connection failed (exit code 4)
    ConnectionFailed = 4,
    /// Invalid input provided (exit code 5)
    InvalidInput = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Convert to process exit code
    pub fn to_exit_code(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self as u8)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExitCode::Success => "SUCCESS",
            ExitCode::GeneralError => "GENERAL_ERROR",
            ExitCode::VerificationFailed => "VERIFICATION_FAILED",
            ExitCode::Timeout => "TIMEOUT",
            ExitCode::ConnectionFailed => "CONNECTION_FAILED",
            ExitCode::InvalidInput => "INVALID_INPUT",
        }
    }

    /// Exit code for an error that escaped a command.
    pub fn for_error(error: &anyhow::Error) -> ExitCode {
        for cause in error.chain() {
            if cause.is::<tokio::time::error::Elapsed>() {
                return ExitCode::Timeout;
            }
            if let Some(e) = cause.downcast_ref::<TransferError>() {
                return match e {
                    TransferError::Transport(_) => ExitCode::ConnectionFailed,
                    TransferError::Crypto(c) => Self::for_crypto(c),
                    e if e.is_invalid_input() => ExitCode::InvalidInput,
                    _ => ExitCode::GeneralError,
                };
            }
            if let Some(e) = cause.downcast_ref::<EnvelopeError>() {
                return match e {
                    EnvelopeError::Crypto(c) => Self::for_crypto(c),
                    _ => ExitCode::InvalidInput,
                };
            }
            if let Some(e) = cause.downcast_ref::<CryptoError>() {
                return Self::for_crypto(e);
            }
            if cause.is::<TransportError>() {
                return ExitCode::ConnectionFailed;
            }
        }
        ExitCode::GeneralError
    }

    fn for_crypto(error: &CryptoError) -> ExitCode {
        match error {
            CryptoError::KeyGeneration(_) | CryptoError::Signing(_) => ExitCode::GeneralError,
            _ => ExitCode::InvalidInput,
        }
    }
}
