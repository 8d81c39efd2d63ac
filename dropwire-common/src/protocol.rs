//! Signaling protocol between peers and the relay
//!
//! Every event is one JSON object per WebSocket text frame, tagged by a
//! kebab-case `type` field. Negotiation payloads are opaque JSON values: the
//! relay checks they are present and forwards them untouched.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Events sent from a peer to the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Register in a room, creating it if absent
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        #[serde(default, deserialize_with = "room_id_or_empty")]
        room_id: String,
    },
    /// Deregister from a room
    #[serde(rename_all = "camelCase")]
    LeaveRoom {
        #[serde(default, deserialize_with = "room_id_or_empty")]
        room_id: String,
    },
    /// Session description offer for the other room member(s)
    #[serde(rename_all = "camelCase")]
    Offer {
        #[serde(default, deserialize_with = "room_id_or_empty")]
        room_id: String,
        #[serde(default)]
        payload: Value,
    },
    /// Session description answer for the other room member(s)
    #[serde(rename_all = "camelCase")]
    Answer {
        #[serde(default, deserialize_with = "room_id_or_empty")]
        room_id: String,
        #[serde(default)]
        payload: Value,
    },
    /// Connectivity candidate for the other room member(s)
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        #[serde(default, deserialize_with = "room_id_or_empty")]
        room_id: String,
        #[serde(default)]
        payload: Value,
    },
    /// Receiver announces it is ready for an offer
    #[serde(rename_all = "camelCase")]
    ReceiverReady {
        #[serde(default, deserialize_with = "room_id_or_empty")]
        room_id: String,
    },
}

/// A missing or `null` room id reads as empty so the relay can answer
/// `room_required` instead of rejecting the whole frame
fn room_id_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ClientEvent {
    /// The room this event targets
    #[must_use]
    pub fn room_id(&self) -> &str {
        match self {
            Self::JoinRoom { room_id }
            | Self::LeaveRoom { room_id }
            | Self::Offer { room_id, .. }
            | Self::Answer { room_id, .. }
            | Self::IceCandidate { room_id, .. }
            | Self::ReceiverReady { room_id } => room_id,
        }
    }

    /// Wire name of this event, used in error replies and logs
    #[must_use]
    pub fn command(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join-room",
            Self::LeaveRoom { .. } => "leave-room",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::ReceiverReady { .. } => "receiver-ready",
        }
    }

    /// Build the event the relay delivers to the other room members
    ///
    /// Returns `None` for lifecycle events, which are not forwarded verbatim.
    #[must_use]
    pub fn into_forwarded(self) -> Option<RelayEvent> {
        match self {
            Self::Offer { payload, .. } => Some(RelayEvent::Offer { payload }),
            Self::Answer { payload, .. } => Some(RelayEvent::Answer { payload }),
            Self::IceCandidate { payload, .. } => Some(RelayEvent::IceCandidate { payload }),
            Self::ReceiverReady { .. } => Some(RelayEvent::ReceiverReady),
            Self::JoinRoom { .. } | Self::LeaveRoom { .. } => None,
        }
    }
}

/// Events sent from the relay to a peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RelayEvent {
    /// Acknowledges a join with the current participant count
    #[serde(rename_all = "camelCase")]
    Joined { room_id: String, participants: usize },
    /// Another participant joined the caller's room
    #[serde(rename_all = "camelCase")]
    PeerJoined { peer_id: String, participants: usize },
    /// Another participant left the caller's room
    #[serde(rename_all = "camelCase")]
    PeerLeft { peer_id: String, participants: usize },
    /// Forwarded offer
    Offer { payload: Value },
    /// Forwarded answer
    Answer { payload: Value },
    /// Forwarded candidate
    IceCandidate { payload: Value },
    /// Forwarded readiness notice
    ReceiverReady,
    /// A request from this peer was rejected
    Error {
        kind: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
    },
}

/// Whether a negotiation payload counts as present
///
/// `null`, empty strings, empty arrays and empty objects are all "empty".
#[must_use]
pub fn payload_is_empty(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
