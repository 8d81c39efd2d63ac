//! Relay client
//!
//! Sessions talk to the relay through the [`Signaling`] trait so tests can
//! substitute a scripted relay. [`RelayClient`] is the WebSocket
//! implementation.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::{WebSocketStream, client_async};
use tracing::debug;

use dropwire_common::DEFAULT_PORT;
use dropwire_common::io::{read_event, send_event};
use dropwire_common::protocol::{ClientEvent, RelayEvent};

/// A connection to the signaling relay
#[async_trait]
pub trait Signaling: Send {
    /// Send one event to the relay
    async fn send(&mut self, event: ClientEvent) -> io::Result<()>;

    /// Wait for the next relay event; `None` once the relay is gone
    ///
    /// Must be cancel safe.
    async fn next_event(&mut self) -> io::Result<Option<RelayEvent>>;

    /// Close the connection
    async fn close(&mut self);
}

/// WebSocket connection to a dropwire relay
pub struct RelayClient {
    ws: WebSocketStream<TcpStream>,
    local_addr: SocketAddr,
}

impl RelayClient {
    /// Connect to a `ws://host[:port]` relay URL
    pub async fn connect(url: &str) -> io::Result<Self> {
        let uri: Uri = url
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("{}: {}", url, e)))?;
        match uri.scheme_str() {
            Some("ws") => {}
            Some(other) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("unsupported relay scheme '{}', expected ws://", other),
                ));
            }
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("relay URL needs a ws:// scheme: {}", url),
                ));
            }
        }
        let host = uri.host().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("relay URL has no host: {}", url))
        })?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = uri.port_u16().unwrap_or(DEFAULT_PORT);

        let stream = TcpStream::connect((host, port)).await?;
        let local_addr = stream.local_addr()?;
        let (ws, _response) = client_async(url, stream).await.map_err(io::Error::other)?;
        debug!("Connected to relay at {}", url);

        Ok(Self { ws, local_addr })
    }

    /// Local address of the relay connection
    ///
    /// This is the interface that routes toward the relay, which is the
    /// natural address to advertise for direct connections.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait]
impl Signaling for RelayClient {
    async fn send(&mut self, event: ClientEvent) -> io::Result<()> {
        send_event(&mut self.ws, &event).await
    }

    async fn next_event(&mut self) -> io::Result<Option<RelayEvent>> {
        read_event(&mut self.ws).await
    }

    async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}
