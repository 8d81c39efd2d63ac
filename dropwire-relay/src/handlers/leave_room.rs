//! Handlers for leave-room and implicit disconnect

use std::io;

use tracing::{debug, warn};

use dropwire_common::protocol::RelayEvent;

use super::HandlerContext;
use crate::peers::{PeerId, PeerManager};
use crate::rooms::RoomRegistry;

/// Handle leave-room
///
/// Leaving a room the peer is not in is a no-op.
pub async fn handle_leave_room(room_id: String, ctx: &HandlerContext<'_>) -> io::Result<()> {
    if !ctx.check_room_id(&room_id, "leave-room")? {
        return Ok(());
    }

    let Some(result) = ctx.rooms.leave(&room_id, ctx.peer_id).await else {
        warn!(peer = %ctx.peer_id, room = %room_id, "leave for a room the peer is not in");
        return Ok(());
    };

    debug!(
        peer = %ctx.peer_id,
        room = %room_id,
        remaining = result.remaining.len(),
        deleted = result.room_deleted,
        "peer left room"
    );
    notify_departure(ctx.peers, ctx.peer_id, &result.remaining).await;
    Ok(())
}

/// Remove a disconnected peer from every room and tell the others
pub async fn handle_disconnect(peer_id: PeerId, rooms: &RoomRegistry, peers: &PeerManager) {
    for (room_id, remaining) in rooms.remove_from_all(peer_id).await {
        debug!(peer = %peer_id, room = %room_id, remaining = remaining.len(), "peer dropped from room");
        notify_departure(peers, peer_id, &remaining).await;
    }
}

async fn notify_departure(peers: &PeerManager, peer_id: PeerId, remaining: &[PeerId]) {
    if remaining.is_empty() {
        return;
    }
    let notice = RelayEvent::PeerLeft {
        peer_id: peer_id.to_string(),
        participants: remaining.len(),
    };
    peers.send_to_all(remaining, &notice).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{create_test_context, drain};

    #[tokio::test]
    async fn test_leave_notifies_remaining() {
        let test_ctx = create_test_context().await;
        let (other_id, mut other_rx) = test_ctx.connect_peer().await;
        test_ctx.rooms.join("abc123", other_id).await;
        test_ctx.rooms.join("abc123", test_ctx.peer_id).await;

        handle_leave_room("abc123".to_string(), &test_ctx.handler_context())
            .await
            .unwrap();

        assert_eq!(
            other_rx.recv().await,
            Some(RelayEvent::PeerLeft {
                peer_id: test_ctx.peer_id.to_string(),
                participants: 1
            })
        );
        assert_eq!(test_ctx.rooms.participants("abc123").await, Some(vec![other_id]));
    }

    #[tokio::test]
    async fn test_last_leave_deletes_room() {
        let mut test_ctx = create_test_context().await;
        test_ctx.rooms.join("abc123", test_ctx.peer_id).await;

        handle_leave_room("abc123".to_string(), &test_ctx.handler_context())
            .await
            .unwrap();

        assert_eq!(test_ctx.rooms.count().await, 0);
        assert!(drain(&mut test_ctx.rx).is_empty());
    }

    #[tokio::test]
    async fn test_leave_unknown_room_is_silent() {
        let mut test_ctx = create_test_context().await;

        handle_leave_room("nowhere".to_string(), &test_ctx.handler_context())
            .await
            .unwrap();

        assert!(drain(&mut test_ctx.rx).is_empty());
    }

    #[tokio::test]
    async fn test_leave_empty_room_id_reports_error() {
        let mut test_ctx = create_test_context().await;

        handle_leave_room(String::new(), &test_ctx.handler_context())
            .await
            .unwrap();

        assert!(matches!(
            test_ctx.rx.recv().await,
            Some(RelayEvent::Error { kind, .. }) if kind == "room_required"
        ));
    }

    #[tokio::test]
    async fn test_disconnect_leaves_every_room() {
        let test_ctx = create_test_context().await;
        let (b, mut b_rx) = test_ctx.connect_peer().await;
        let (c, mut c_rx) = test_ctx.connect_peer().await;
        test_ctx.rooms.join("one", test_ctx.peer_id).await;
        test_ctx.rooms.join("one", b).await;
        test_ctx.rooms.join("two", test_ctx.peer_id).await;
        test_ctx.rooms.join("two", c).await;
        test_ctx.rooms.join("solo", test_ctx.peer_id).await;

        handle_disconnect(test_ctx.peer_id, &test_ctx.rooms, &test_ctx.peers).await;

        assert_eq!(drain(&mut b_rx).len(), 1);
        assert_eq!(drain(&mut c_rx).len(), 1);
        assert_eq!(test_ctx.rooms.count().await, 2);
        assert!(test_ctx.rooms.participants("solo").await.is_none());
    }
}
