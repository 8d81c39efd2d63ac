//! Dropwire Common Library
//!
//! Shared types, protocols, and utilities for the dropwire relay and peers.

mod error_kind;
pub mod control;
pub mod framing;
pub mod io;
pub mod link;
pub mod protocol;
pub mod validators;

use std::time::Duration;

pub use error_kind::RelayErrorKind;

/// Default port for the signaling relay WebSocket listener
pub const DEFAULT_PORT: u16 = 8080;

/// Default port for the relay's read-only HTTP diagnostics
pub const DEFAULT_HTTP_PORT: u16 = 8081;

/// Default relay URL used by peers when none is given
pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:8080";

/// Default origin used when building share links
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// How often the relay sweeps for empty rooms
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(300);

/// Maximum size of a single WebSocket message accepted by the relay
///
/// Negotiation payloads are small; anything near this size is misuse.
pub const MAX_RELAY_MESSAGE_SIZE: usize = 64 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port() {
        assert_eq!(DEFAULT_PORT, 8080);
    }

    #[test]
    fn test_ports_are_distinct() {
        assert_ne!(DEFAULT_PORT, DEFAULT_HTTP_PORT);
    }

    #[test]
    fn test_default_relay_url_uses_default_port() {
        assert!(DEFAULT_RELAY_URL.ends_with(&format!(":{}", DEFAULT_PORT)));
    }

    #[test]
    fn test_reap_interval() {
        assert_eq!(DEFAULT_REAP_INTERVAL.as_secs(), 300);
    }
}
