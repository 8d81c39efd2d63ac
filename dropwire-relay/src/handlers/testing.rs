//! Shared test utilities for handler tests

use std::net::SocketAddr;

use tokio::sync::mpsc;

use dropwire_common::protocol::RelayEvent;

use super::HandlerContext;
use crate::peers::{EventSender, PeerId, PeerManager};
use crate::rooms::RoomRegistry;

/// Registries plus one registered connection to run handlers as
pub struct TestContext {
    pub rooms: RoomRegistry,
    pub peers: PeerManager,
    pub peer_id: PeerId,
    pub peer_addr: SocketAddr,
    pub tx: EventSender,
    /// Events queued for the connection under test
    pub rx: mpsc::UnboundedReceiver<RelayEvent>,
}

impl TestContext {
    /// Borrow a handler context for the connection under test
    pub fn handler_context(&self) -> HandlerContext<'_> {
        HandlerContext {
            peer_id: self.peer_id,
            peer_addr: self.peer_addr,
            rooms: &self.rooms,
            peers: &self.peers,
            tx: &self.tx,
        }
    }

    /// Register another connection and return its id and event queue
    pub async fn connect_peer(&self) -> (PeerId, mpsc::UnboundedReceiver<RelayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.peers.register(tx).await;
        (id, rx)
    }
}

/// Create a fresh context with one registered connection
pub async fn create_test_context() -> TestContext {
    let rooms = RoomRegistry::new();
    let peers = PeerManager::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let peer_id = peers.register(tx.clone()).await;

    TestContext {
        rooms,
        peers,
        peer_id,
        peer_addr: "127.0.0.1:50000".parse().expect("valid test address"),
        tx,
        rx,
    }
}

/// Take every event currently queued
pub fn drain(rx: &mut mpsc::UnboundedReceiver<RelayEvent>) -> Vec<RelayEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
