//! Constants shared across the relay

use std::time::Duration;

/// Banner printed at startup
pub const MSG_BANNER: &str = "dropwire signaling relay v";

/// Message reported by the health endpoint
pub const MSG_HEALTH: &str = "dropwire signaling relay";

/// How often the relay pings each signaling connection
pub const PING_INTERVAL: Duration = Duration::from_secs(25);

/// Silence after which a signaling connection is considered dead
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Error used when a connection's outgoing queue has been dropped
pub const ERR_CHANNEL_CLOSED: &str = "outgoing event channel closed";
