//! sft-relay: TCP relay hub for signed file transfer
//!
//! Peers connect, send length-prefixed envelope frames, and receive every
//! frame the other peers send. The relay forwards bytes only; it never
//! verifies, stores or inspects transfers.

pub mod config;
pub mod server;

pub use config::{ConfigError, ServerConfig};
pub use server::{RelayServer, RelayStats};
