//! Dropwire Signaling Relay Library
//!
//! This library exposes the relay's internal modules for integration testing.

pub mod connection;
pub mod constants;
pub mod handlers;
pub mod http;
pub mod peers;
pub mod reaper;
pub mod rooms;
pub mod server;
