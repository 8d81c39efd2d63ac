//! Direct TCP channels negotiated through the relay
//!
//! The offering side listens on an ephemeral port and trickles one
//! `{"addr":"ip:port"}` candidate per advertised address. The answering side
//! dials candidates as they arrive. Offer and answer carry a random session
//! token; the dialer writes it as its first frame and the listener drops any
//! connection that presents a different one.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::RngExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use dropwire_common::framing::{Frame, FrameReader, FrameWriter};

use crate::channel::spawn_stream_channel;
use crate::negotiation::{NegotiationError, NegotiationEvent, Negotiator};

/// Negotiation kind carried in offers and answers
const KIND_TCP: &str = "tcp";

/// Random bytes in a session token
const TOKEN_BYTES: usize = 16;

/// How long a connecting peer has to present its token
const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize, Deserialize)]
struct SessionDescription {
    kind: String,
    token: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Candidate {
    addr: SocketAddr,
}

/// Negotiates a [`DirectChannel`](crate::channel::DirectChannel) over TCP
pub struct TcpNegotiator {
    bind: IpAddr,
    advertise: Vec<IpAddr>,
    token: Option<String>,
    offered: bool,
    opened: Arc<AtomicBool>,
    events_tx: mpsc::UnboundedSender<NegotiationEvent>,
    events_rx: mpsc::UnboundedReceiver<NegotiationEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl TcpNegotiator {
    /// Create a negotiator that listens on `bind` and advertises `advertise`
    ///
    /// With no advertised addresses the bound address itself is advertised.
    pub fn new(bind: IpAddr, advertise: Vec<IpAddr>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            bind,
            advertise,
            token: None,
            offered: false,
            opened: Arc::new(AtomicBool::new(false)),
            events_tx,
            events_rx,
            tasks: Vec::new(),
        }
    }

    fn description(&self, token: &str) -> Value {
        serde_json::to_value(SessionDescription {
            kind: KIND_TCP.to_string(),
            token: token.to_string(),
        })
        .unwrap_or(Value::Null)
    }
}

fn parse_description(value: Value, what: &'static str) -> Result<String, NegotiationError> {
    let description: SessionDescription =
        serde_json::from_value(value).map_err(|e| NegotiationError::Malformed {
            what,
            reason: e.to_string(),
        })?;
    if description.kind != KIND_TCP {
        return Err(NegotiationError::Malformed {
            what,
            reason: format!("unsupported kind '{}'", description.kind),
        });
    }
    if description.token.is_empty() {
        return Err(NegotiationError::Malformed {
            what,
            reason: "missing token".to_string(),
        });
    }
    Ok(description.token)
}

fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
    hex::encode(bytes)
}

#[async_trait]
impl Negotiator for TcpNegotiator {
    async fn create_offer(&mut self) -> Result<Value, NegotiationError> {
        if self.offered || self.token.is_some() {
            return Err(NegotiationError::OutOfOrder("offer"));
        }

        let listener = TcpListener::bind(SocketAddr::new(self.bind, 0))
            .await
            .map_err(|e| NegotiationError::Transport(e.to_string()))?;
        let local = listener
            .local_addr()
            .map_err(|e| NegotiationError::Transport(e.to_string()))?;
        debug!("Listening for direct connection on {}", local);

        let token = generate_token();
        self.token = Some(token.clone());
        self.offered = true;

        let addresses = if self.advertise.is_empty() {
            vec![local.ip()]
        } else {
            self.advertise.clone()
        };
        for ip in addresses {
            let candidate = Candidate {
                addr: SocketAddr::new(ip, local.port()),
            };
            if let Ok(value) = serde_json::to_value(candidate) {
                let _ = self.events_tx.send(NegotiationEvent::LocalCandidate(value));
            }
        }

        self.tasks.push(tokio::spawn(accept_loop(
            listener,
            token.clone(),
            self.opened.clone(),
            self.events_tx.clone(),
        )));

        Ok(self.description(&token))
    }

    async fn accept_offer(&mut self, offer: Value) -> Result<Value, NegotiationError> {
        if self.offered || self.token.is_some() {
            return Err(NegotiationError::OutOfOrder("offer"));
        }
        let token = parse_description(offer, "offer")?;
        self.token = Some(token.clone());
        Ok(self.description(&token))
    }

    async fn accept_answer(&mut self, answer: Value) -> Result<(), NegotiationError> {
        let Some(expected) = self.token.as_deref().filter(|_| self.offered) else {
            return Err(NegotiationError::OutOfOrder("answer"));
        };
        let token = parse_description(answer, "answer")?;
        if token != expected {
            return Err(NegotiationError::TokenMismatch);
        }
        Ok(())
    }

    async fn add_remote_candidate(&mut self, candidate: Value) -> Result<(), NegotiationError> {
        if self.offered {
            debug!("Ignoring remote candidate on listening side");
            return Ok(());
        }
        let Some(token) = self.token.clone() else {
            return Err(NegotiationError::OutOfOrder("candidate"));
        };
        let candidate: Candidate =
            serde_json::from_value(candidate).map_err(|e| NegotiationError::Malformed {
                what: "candidate",
                reason: e.to_string(),
            })?;

        self.tasks.push(tokio::spawn(dial(
            candidate.addr,
            token,
            self.opened.clone(),
            self.events_tx.clone(),
        )));
        Ok(())
    }

    async fn next_event(&mut self) -> Option<NegotiationEvent> {
        self.events_rx.recv().await
    }
}

impl Drop for TcpNegotiator {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// Accept connections until one presents the right token
///
/// Each connection gets its own token check so a silent one cannot hold up
/// the real dialer.
async fn accept_loop(
    listener: TcpListener,
    token: String,
    opened: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<NegotiationEvent>,
) {
    while !opened.load(Ordering::SeqCst) {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                let _ = events.send(NegotiationEvent::Failed(NegotiationError::Transport(
                    e.to_string(),
                )));
                return;
            }
        };
        tokio::spawn(admit(
            stream,
            peer_addr,
            token.clone(),
            opened.clone(),
            events.clone(),
        ));
    }
}

/// Open the channel if `stream` presents `token` in time
async fn admit(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    token: String,
    opened: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<NegotiationEvent>,
) {
    let presented =
        tokio::time::timeout(TOKEN_TIMEOUT, FrameReader::new(&mut stream).read_frame()).await;
    match presented {
        Ok(Ok(Some(Frame::Text(presented)))) if presented == token => {}
        _ => {
            warn!("Rejected direct connection from {}: bad token", peer_addr);
            return;
        }
    }

    if opened.swap(true, Ordering::SeqCst) {
        debug!("Already connected, dropping {}", peer_addr);
        return;
    }
    info!("Direct connection from {}", peer_addr);
    let _ = events.send(NegotiationEvent::ChannelOpen(spawn_stream_channel(stream)));
}

/// Dial one candidate and present the token
async fn dial(
    addr: SocketAddr,
    token: String,
    opened: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<NegotiationEvent>,
) {
    let mut stream = match TcpStream::connect(addr).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Could not reach candidate {}: {}", addr, e);
            return;
        }
    };
    if let Err(e) = FrameWriter::new(&mut stream)
        .write_frame(&Frame::Text(token))
        .await
    {
        warn!("Could not present token to {}: {}", addr, e);
        return;
    }
    if opened.swap(true, Ordering::SeqCst) {
        debug!("Already connected, dropping candidate {}", addr);
        return;
    }
    info!("Direct connection to {}", addr);
    let _ = events.send(NegotiationEvent::ChannelOpen(spawn_stream_channel(stream)));
}
