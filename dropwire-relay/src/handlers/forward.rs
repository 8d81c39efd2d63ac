//! Handler for offer, answer, ice-candidate and receiver-ready
//!
//! These events are relayed verbatim to every other participant of the room.
//! The relay looks at the payload only to check it is there.

use std::io;

use tracing::debug;

use dropwire_common::RelayErrorKind;
use dropwire_common::protocol::{ClientEvent, payload_is_empty};

use super::{HandlerContext, err_not_in_room, err_payload_required};

/// Handle a negotiation message
pub async fn handle_forward(event: ClientEvent, ctx: &HandlerContext<'_>) -> io::Result<()> {
    let command = event.command();
    let room_id = event.room_id().to_string();

    if !ctx.check_room_id(&room_id, command)? {
        return Ok(());
    }

    let payload_missing = match &event {
        ClientEvent::Offer { payload, .. }
        | ClientEvent::Answer { payload, .. }
        | ClientEvent::IceCandidate { payload, .. } => payload_is_empty(payload),
        _ => false,
    };
    if payload_missing {
        return ctx.send_error(
            RelayErrorKind::PayloadRequired,
            err_payload_required(command),
            Some(command),
        );
    }

    let recipients = match ctx.rooms.forward(&room_id, ctx.peer_id).await {
        Ok(recipients) => recipients,
        Err(_) => {
            return ctx.send_error(
                RelayErrorKind::NotInRoom,
                err_not_in_room(&room_id),
                Some(command),
            );
        }
    };

    let Some(forwarded) = event.into_forwarded() else {
        return Ok(());
    };

    let delivered = ctx.peers.send_to_all(&recipients, &forwarded).await;
    debug!(peer = %ctx.peer_id, room = %room_id, command, delivered, "forwarded message");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{create_test_context, drain};
    use dropwire_common::protocol::RelayEvent;
    use serde_json::json;

    #[tokio::test]
    async fn test_offer_forwarded_verbatim() {
        let mut test_ctx = create_test_context().await;
        let (other_id, mut other_rx) = test_ctx.connect_peer().await;
        test_ctx.rooms.join("abc123", test_ctx.peer_id).await;
        test_ctx.rooms.join("abc123", other_id).await;

        let payload = json!({"sdp": "v=0", "type": "offer"});
        handle_forward(
            ClientEvent::Offer {
                room_id: "abc123".to_string(),
                payload: payload.clone(),
            },
            &test_ctx.handler_context(),
        )
        .await
        .unwrap();

        assert_eq!(other_rx.recv().await, Some(RelayEvent::Offer { payload }));
        assert!(drain(&mut test_ctx.rx).is_empty(), "sender gets no echo");
    }

    #[tokio::test]
    async fn test_candidate_reaches_every_other_member() {
        let mut test_ctx = create_test_context().await;
        let (b, mut b_rx) = test_ctx.connect_peer().await;
        let (c, mut c_rx) = test_ctx.connect_peer().await;
        for id in [test_ctx.peer_id, b, c] {
            test_ctx.rooms.join("room", id).await;
        }

        handle_forward(
            ClientEvent::IceCandidate {
                room_id: "room".to_string(),
                payload: json!({"addr": "10.0.0.1:4000"}),
            },
            &test_ctx.handler_context(),
        )
        .await
        .unwrap();

        assert_eq!(drain(&mut b_rx).len(), 1);
        assert_eq!(drain(&mut c_rx).len(), 1);
    }

    #[tokio::test]
    async fn test_empty_room_id_forwards_nothing() {
        let mut test_ctx = create_test_context().await;
        let (other_id, mut other_rx) = test_ctx.connect_peer().await;
        test_ctx.rooms.join("abc123", test_ctx.peer_id).await;
        test_ctx.rooms.join("abc123", other_id).await;

        handle_forward(
            ClientEvent::Answer {
                room_id: String::new(),
                payload: json!({"sdp": "v=0"}),
            },
            &test_ctx.handler_context(),
        )
        .await
        .unwrap();

        assert!(matches!(
            test_ctx.rx.recv().await,
            Some(RelayEvent::Error { kind, .. }) if kind == "room_required"
        ));
        assert!(drain(&mut other_rx).is_empty());
    }

    #[tokio::test]
    async fn test_empty_payload_forwards_nothing() {
        let mut test_ctx = create_test_context().await;
        let (other_id, mut other_rx) = test_ctx.connect_peer().await;
        test_ctx.rooms.join("abc123", test_ctx.peer_id).await;
        test_ctx.rooms.join("abc123", other_id).await;

        handle_forward(
            ClientEvent::Offer {
                room_id: "abc123".to_string(),
                payload: serde_json::Value::Null,
            },
            &test_ctx.handler_context(),
        )
        .await
        .unwrap();

        match test_ctx.rx.recv().await {
            Some(RelayEvent::Error { kind, command, .. }) => {
                assert_eq!(kind, "payload_required");
                assert_eq!(command.as_deref(), Some("offer"));
            }
            other => panic!("expected error, got {:?}", other),
        }
        assert!(drain(&mut other_rx).is_empty());
    }

    #[tokio::test]
    async fn test_non_member_rejected() {
        let mut test_ctx = create_test_context().await;
        let (other_id, mut other_rx) = test_ctx.connect_peer().await;
        test_ctx.rooms.join("abc123", other_id).await;

        handle_forward(
            ClientEvent::Offer {
                room_id: "abc123".to_string(),
                payload: json!({"sdp": "v=0"}),
            },
            &test_ctx.handler_context(),
        )
        .await
        .unwrap();

        assert!(matches!(
            test_ctx.rx.recv().await,
            Some(RelayEvent::Error { kind, .. }) if kind == "not_in_room"
        ));
        assert!(drain(&mut other_rx).is_empty());
    }

    #[tokio::test]
    async fn test_receiver_ready_needs_no_payload() {
        let mut test_ctx = create_test_context().await;
        let (other_id, mut other_rx) = test_ctx.connect_peer().await;
        test_ctx.rooms.join("abc123", other_id).await;
        test_ctx.rooms.join("abc123", test_ctx.peer_id).await;

        handle_forward(
            ClientEvent::ReceiverReady {
                room_id: "abc123".to_string(),
            },
            &test_ctx.handler_context(),
        )
        .await
        .unwrap();

        assert_eq!(other_rx.recv().await, Some(RelayEvent::ReceiverReady));
    }
}
