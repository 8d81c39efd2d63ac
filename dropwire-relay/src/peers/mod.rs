//! Peer registry for tracking connected signaling clients

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::{RwLock, mpsc};

use dropwire_common::protocol::RelayEvent;

/// Relay-assigned identifier for one WebSocket connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u32);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outgoing event queue for one connection
pub type EventSender = mpsc::UnboundedSender<RelayEvent>;

/// Manages all connected peers
#[derive(Debug, Clone)]
pub struct PeerManager {
    peers: Arc<RwLock<HashMap<PeerId, EventSender>>>,
    next_id: Arc<AtomicU32>,
}

impl PeerManager {
    /// Create a new peer manager
    pub fn new() -> Self {
        Self {
            peers: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Generate the next peer ID
    fn next_peer_id(&self) -> PeerId {
        PeerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a connection's outgoing queue and assign it an id
    pub async fn register(&self, tx: EventSender) -> PeerId {
        let peer_id = self.next_peer_id();
        self.peers.write().await.insert(peer_id, tx);
        peer_id
    }

    /// Forget a connection
    pub async fn unregister(&self, peer_id: PeerId) {
        self.peers.write().await.remove(&peer_id);
    }

    /// Queue the same event for several peers
    ///
    /// Returns how many peers it was delivered to.
    pub async fn send_to_all(&self, peer_ids: &[PeerId], event: &RelayEvent) -> usize {
        let peers = self.peers.read().await;
        peer_ids
            .iter()
            .filter_map(|id| peers.get(id))
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }

    /// Number of connected peers
    pub async fn count(&self) -> usize {
        self.peers.read().await.len()
    }
}

impl Default for PeerManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_assigns_unique_ids() {
        let manager = PeerManager::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        let a = manager.register(tx1).await;
        let b = manager.register(tx2).await;

        assert_ne!(a, b);
        assert_eq!(manager.count().await, 2);
    }

    #[tokio::test]
    async fn test_send_to_all_skips_closed_queue() {
        let manager = PeerManager::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        let a = manager.register(tx1).await;
        let b = manager.register(tx2).await;
        drop(rx2);

        let delivered = manager.send_to_all(&[a, b], &RelayEvent::ReceiverReady).await;

        assert_eq!(delivered, 1);
        assert_eq!(rx1.recv().await, Some(RelayEvent::ReceiverReady));
    }

    #[tokio::test]
    async fn test_send_to_all_skips_missing() {
        let manager = PeerManager::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let a = manager.register(tx1).await;
        let b = manager.register(tx2).await;

        let delivered = manager
            .send_to_all(&[a, PeerId(999), b], &RelayEvent::ReceiverReady)
            .await;

        assert_eq!(delivered, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_unregister() {
        let manager = PeerManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = manager.register(tx).await;

        manager.unregister(id).await;

        assert_eq!(manager.count().await, 0);
        assert_eq!(manager.send_to_all(&[id], &RelayEvent::ReceiverReady).await, 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(PeerId(17).to_string(), "17");
    }
}
