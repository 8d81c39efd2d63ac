//! Client connection handling

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, warn};

use dropwire_common::MAX_RELAY_MESSAGE_SIZE;
use dropwire_common::RelayErrorKind;
use dropwire_common::io::{Incoming, classify, send_event};
use dropwire_common::protocol::{ClientEvent, RelayEvent};

use crate::constants::{IDLE_TIMEOUT, PING_INTERVAL};
use crate::handlers::{self, HandlerContext, err_invalid_message};
use crate::peers::PeerManager;
use crate::rooms::RoomRegistry;

/// Parameters for handling a connection
pub struct ConnectionParams {
    pub peer_addr: SocketAddr,
    pub rooms: RoomRegistry,
    pub peers: PeerManager,
    pub keepalive: Keepalive,
}

/// Liveness checks for a signaling connection
///
/// The relay pings every `interval` and drops a peer it has not heard from
/// (any frame, pongs included) for `timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keepalive {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for Keepalive {
    fn default() -> Self {
        Self {
            interval: PING_INTERVAL,
            timeout: IDLE_TIMEOUT,
        }
    }
}

/// WebSocket limits for signaling connections
fn websocket_config() -> WebSocketConfig {
    WebSocketConfig::default()
        .max_message_size(Some(MAX_RELAY_MESSAGE_SIZE))
        .max_frame_size(Some(MAX_RELAY_MESSAGE_SIZE))
}

/// Handle a client connection over any byte stream
///
/// Performs the WebSocket upgrade, then serves events until the peer goes
/// away. On exit the peer is removed from every room it was in.
pub async fn handle_connection<S>(socket: S, params: ConnectionParams) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let ConnectionParams {
        peer_addr,
        rooms,
        peers,
        keepalive,
    } = params;

    let ws_stream = tokio_tungstenite::accept_async_with_config(socket, Some(websocket_config()))
        .await
        .map_err(|e| io::Error::other(format!("WebSocket handshake failed: {}", e)))?;
    let (mut sink, mut stream) = ws_stream.split();

    // Create channel for receiving relay events to send to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<RelayEvent>();
    let peer_id = peers.register(tx.clone()).await;
    debug!(peer = %peer_id, addr = %peer_addr, "peer connected");

    let mut ping = tokio::time::interval(keepalive.interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await;
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            incoming = stream.next() => {
                let message = match incoming {
                    Some(Ok(message)) => {
                        last_seen = Instant::now();
                        message
                    }
                    Some(Err(e)) => {
                        debug!(peer = %peer_id, error = %e, "read failed");
                        break;
                    }
                    None => break,
                };

                match classify::<ClientEvent>(message) {
                    Incoming::Event(event) => {
                        let ctx = HandlerContext {
                            peer_id,
                            peer_addr,
                            rooms: &rooms,
                            peers: &peers,
                            tx: &tx,
                        };
                        if let Err(e) = handlers::handle_client_event(event, &ctx).await {
                            warn!(peer = %peer_id, error = %e, "error handling event");
                            break;
                        }
                    }
                    Incoming::Invalid(reason) => {
                        warn!(peer = %peer_id, %reason, "rejected frame");
                        let error = RelayEvent::Error {
                            kind: RelayErrorKind::InvalidMessage.into(),
                            message: err_invalid_message(&reason),
                            command: None,
                        };
                        if tx.send(error).is_err() {
                            break;
                        }
                    }
                    Incoming::Control => {}
                    Incoming::Close => break,
                }
            }

            outgoing = rx.recv() => {
                match outgoing {
                    Some(event) => {
                        if send_event(&mut sink, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            _ = ping.tick() => {
                if last_seen.elapsed() >= keepalive.timeout {
                    debug!(peer = %peer_id, "peer timed out");
                    break;
                }
                if sink.send(Message::Ping(Vec::<u8>::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    peers.unregister(peer_id).await;
    handlers::handle_disconnect(peer_id, &rooms, &peers).await;
    let _ = sink.close().await;
    debug!(peer = %peer_id, "peer disconnected");

    Ok(())
}
