//! Signaling accept loop

use std::io;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::connection::{ConnectionParams, Keepalive, handle_connection};
use crate::peers::PeerManager;
use crate::rooms::RoomRegistry;

/// Accept signaling connections forever, one task per connection
pub async fn serve(listener: TcpListener, rooms: RoomRegistry, peers: PeerManager) -> io::Result<()> {
    serve_with_keepalive(listener, rooms, peers, Keepalive::default()).await
}

/// [`serve`] with custom liveness timing
pub async fn serve_with_keepalive(
    listener: TcpListener,
    rooms: RoomRegistry,
    peers: PeerManager,
    keepalive: Keepalive,
) -> io::Result<()> {
    loop {
        let (socket, peer_addr) = listener.accept().await?;
        let params = ConnectionParams {
            peer_addr,
            rooms: rooms.clone(),
            peers: peers.clone(),
            keepalive,
        };

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, params).await {
                log_connection_error(&e, peer_addr);
            }
        });
    }
}

/// Log a connection error, keeping handshake noise at debug level
fn log_connection_error(error: &io::Error, peer_addr: SocketAddr) {
    if error.to_string().contains("handshake failed") {
        debug!(addr = %peer_addr, %error, "connection rejected");
    } else {
        warn!(addr = %peer_addr, %error, "connection error");
    }
}
