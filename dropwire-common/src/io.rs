//! I/O utilities for sending and receiving signaling events
//!
//! This module is the interface between the protocol event types
//! ([`ClientEvent`](crate::protocol::ClientEvent),
//! [`RelayEvent`](crate::protocol::RelayEvent)) and the WebSocket wire
//! format: one JSON object per text frame.

use std::io;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

// =============================================================================
// Frame Classification
// =============================================================================

/// Result of interpreting one WebSocket message as a signaling event
#[derive(Debug)]
pub enum Incoming<T> {
    /// A well-formed event
    Event(T),
    /// A frame that is not a valid event; carries a description for the error reply
    Invalid(String),
    /// Ping/pong or other control traffic with nothing to handle
    Control,
    /// Peer sent a close frame
    Close,
}

/// Interpret one WebSocket message
///
/// Binary frames are never valid: signaling is text-only, so file bytes
/// cannot be pushed through the relay.
pub fn classify<T: DeserializeOwned>(message: Message) -> Incoming<T> {
    match message {
        Message::Text(text) => match serde_json::from_str::<T>(text.as_str()) {
            Ok(event) => Incoming::Event(event),
            Err(e) => Incoming::Invalid(format!("invalid event: {}", e)),
        },
        Message::Binary(_) => Incoming::Invalid("binary frames are not accepted".to_string()),
        Message::Close(_) => Incoming::Close,
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Incoming::Control,
    }
}

// =============================================================================
// Sending
// =============================================================================

/// Serialize an event and send it as a single text frame
pub async fn send_event<S, T>(sink: &mut S, event: &T) -> io::Result<()>
where
    S: Sink<Message, Error = WsError> + Unpin,
    T: Serialize,
{
    let text = encode_event(event)?;
    sink.send(Message::Text(text.into()))
        .await
        .map_err(io::Error::other)
}

/// Serialize an event to its wire text
pub fn encode_event<T: Serialize>(event: &T) -> io::Result<String> {
    serde_json::to_string(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

// =============================================================================
// Receiving
// =============================================================================

/// Read the next event, skipping control traffic
///
/// Returns `Ok(None)` when the stream ends or the peer closes cleanly.
///
/// # Errors
///
/// Returns `InvalidData` for a frame that is not a valid event, or the
/// underlying transport error.
pub async fn read_event<S, T>(stream: &mut S) -> io::Result<Option<T>>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
    T: DeserializeOwned,
{
    while let Some(message) = stream.next().await {
        let message = message.map_err(io::Error::other)?;
        match classify(message) {
            Incoming::Event(event) => return Ok(Some(event)),
            Incoming::Invalid(reason) => {
                return Err(io::Error::new(io::ErrorKind::InvalidData, reason));
            }
            Incoming::Close => return Ok(None),
            Incoming::Control => continue,
        }
    }
    Ok(None)
}
