//! sft-core: one signed file, from disk to envelope to verified session.
//!
//! This crate implements:
//! - The transfer envelope schema and its validation
//! - Outbound file loading with size limits
//! - Receiver sessions that track whether a file has been verified
//! - Async wrappers that keep crypto work off the runtime
//! - Envelope send/receive over any message channel

#![forbid(unsafe_code)]

pub mod channel;
pub mod envelope;
pub mod errors;
pub mod session;
pub mod source;
pub mod tasks;

#[cfg(test)]
mod proptests;

pub use channel::ChannelAdapter;
pub use envelope::{validate_file_name, TransferEnvelope};
pub use errors::{EnvelopeError, TransferError};
pub use session::{Authenticity, Preview, Rejection, TransferSession};
pub use source::{guess_media_type, OutboundFile, DEFAULT_MAX_FILE_SIZE};
