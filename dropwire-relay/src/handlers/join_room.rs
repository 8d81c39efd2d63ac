//! Handler for join-room - register in a room

use std::io;

use tracing::{debug, warn};

use dropwire_common::protocol::RelayEvent;

use super::HandlerContext;

/// Handle join-room
///
/// Replies `joined` with the participant count and tells every other
/// participant about the newcomer with `peer-joined`.
pub async fn handle_join_room(room_id: String, ctx: &HandlerContext<'_>) -> io::Result<()> {
    if !ctx.check_room_id(&room_id, "join-room")? {
        return Ok(());
    }

    let result = ctx.rooms.join(&room_id, ctx.peer_id).await;

    if result.already_member {
        warn!(peer = %ctx.peer_id, room = %room_id, "peer rejoined a room it is already in");
    } else {
        debug!(
            peer = %ctx.peer_id,
            addr = %ctx.peer_addr,
            room = %room_id,
            participants = result.participants,
            "peer joined room"
        );

        let notice = RelayEvent::PeerJoined {
            peer_id: ctx.peer_id.to_string(),
            participants: result.participants,
        };
        ctx.peers.send_to_all(&result.others, &notice).await;
    }

    ctx.send_event(RelayEvent::Joined {
        room_id,
        participants: result.participants,
    })
}
