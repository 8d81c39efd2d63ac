//! Event handlers for relay clients

mod errors;
mod forward;
mod join_room;
mod leave_room;

#[cfg(test)]
pub mod testing;

pub use errors::*;
pub use forward::handle_forward;
pub use join_room::handle_join_room;
pub use leave_room::{handle_disconnect, handle_leave_room};

use std::io;
use std::net::SocketAddr;

use dropwire_common::RelayErrorKind;
use dropwire_common::protocol::{ClientEvent, RelayEvent};
use dropwire_common::validators::{RoomIdError, validate_room_id};

use crate::constants::ERR_CHANNEL_CLOSED;
use crate::peers::{EventSender, PeerId, PeerManager};
use crate::rooms::RoomRegistry;

/// Context passed to all handlers with shared resources
pub struct HandlerContext<'a> {
    /// Id of the connection being served
    pub peer_id: PeerId,
    pub peer_addr: SocketAddr,
    pub rooms: &'a RoomRegistry,
    pub peers: &'a PeerManager,
    /// This connection's own outgoing queue
    pub tx: &'a EventSender,
}

impl HandlerContext<'_> {
    /// Queue an event for this connection
    ///
    /// Replies go through the same queue as forwarded events so the peer sees
    /// them in the order the relay produced them.
    pub fn send_event(&self, event: RelayEvent) -> io::Result<()> {
        self.tx
            .send(event)
            .map_err(|_| io::Error::other(ERR_CHANNEL_CLOSED))
    }

    /// Send an error event without disconnecting
    pub fn send_error(
        &self,
        kind: RelayErrorKind,
        message: String,
        command: Option<&str>,
    ) -> io::Result<()> {
        self.send_event(RelayEvent::Error {
            kind: kind.into(),
            message,
            command: command.map(str::to_string),
        })
    }

    /// Validate a room id, replying with the matching error if it is bad
    ///
    /// Returns `Ok(false)` when an error was sent and the handler should stop.
    pub fn check_room_id(&self, room_id: &str, command: &str) -> io::Result<bool> {
        match validate_room_id(room_id) {
            Ok(()) => Ok(true),
            Err(RoomIdError::Empty) => {
                self.send_error(RelayErrorKind::RoomRequired, err_room_required(), Some(command))?;
                Ok(false)
            }
            Err(e) => {
                self.send_error(RelayErrorKind::InvalidRoom, err_invalid_room(&e), Some(command))?;
                Ok(false)
            }
        }
    }
}

/// Dispatch one client event to its handler
pub async fn handle_client_event(event: ClientEvent, ctx: &HandlerContext<'_>) -> io::Result<()> {
    match event {
        ClientEvent::JoinRoom { room_id } => handle_join_room(room_id, ctx).await,
        ClientEvent::LeaveRoom { room_id } => handle_leave_room(room_id, ctx).await,
        forwarded => handle_forward(forwarded, ctx).await,
    }
}
