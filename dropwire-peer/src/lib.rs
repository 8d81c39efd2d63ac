//! Dropwire peer library
//!
//! Encrypted one-shot file transfer between two peers. The sender encrypts
//! the file, waits in a relay room for the receiver, and streams the blob
//! over a direct channel; the key only ever travels inside the share link.

pub mod channel;
pub mod chunk;
pub mod crypto;
pub mod error;
pub mod flow;
pub mod negotiation;
pub mod session;
pub mod signaling;
pub mod sink;
pub mod transport;

pub use error::SessionError;
