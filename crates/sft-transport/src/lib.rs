//! Transport abstractions and framing for sft.
//!
//! The signing core never touches sockets. It hands whole envelope frames to
//! a [`MessageChannel`], which must deliver each frame atomically and
//! byte-for-byte.

pub mod framing;
pub mod tcp;
pub mod testing;
pub mod traits;

pub use framing::*;
pub use tcp::*;
pub use testing::*;
pub use traits::*;
