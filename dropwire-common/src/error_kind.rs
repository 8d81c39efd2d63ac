//! Machine-readable error kinds for relay errors
//!
//! These error kinds are serialized to strings in `error` events,
//! allowing peers to make decisions based on the error type
//! (e.g., showing "room not found" instead of a generic failure).

use std::fmt;

/// Error kinds reported by the signaling relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayErrorKind {
    /// Request carried an empty room id
    RoomRequired,

    /// Room id is present but malformed
    ///
    /// Too long, or contains characters outside `[A-Za-z0-9_-]`.
    InvalidRoom,

    /// Negotiation message carried an empty or null payload
    PayloadRequired,

    /// Sender tried to forward into a room it has not joined
    NotInRoom,

    /// Frame was not a recognizable relay event
    ///
    /// Covers malformed JSON, unknown `type` values and binary frames.
    InvalidMessage,
}

impl RelayErrorKind {
    /// Convert to the string representation used in protocol messages
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoomRequired => "room_required",
            Self::InvalidRoom => "invalid_room",
            Self::PayloadRequired => "payload_required",
            Self::NotInRoom => "not_in_room",
            Self::InvalidMessage => "invalid_message",
        }
    }
}

impl fmt::Display for RelayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RelayErrorKind> for String {
    fn from(kind: RelayErrorKind) -> Self {
        kind.as_str().to_string()
    }
}
