//! Ways of opening a [`DirectChannel`](crate::channel::DirectChannel)

pub mod memory;
pub mod tcp;

pub use tcp::TcpNegotiator;
