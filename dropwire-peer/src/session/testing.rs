//! Test doubles for driving sessions without a network

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::{Notify, mpsc};

use dropwire_common::protocol::{ClientEvent, RelayEvent};

use crate::channel::DirectChannel;
use crate::negotiation::{NegotiationError, NegotiationEvent, Negotiator};
use crate::signaling::Signaling;
use crate::transport::memory;

/// Relay side of a [`ScriptedSignaling`]
pub struct ScriptedRelay {
    incoming: mpsc::UnboundedSender<RelayEvent>,
    sent: Arc<Mutex<Vec<ClientEvent>>>,
    sent_notify: Arc<Notify>,
}

/// Session side: replays pushed events and records what the session sends
pub struct ScriptedSignaling {
    incoming: mpsc::UnboundedReceiver<RelayEvent>,
    sent: Arc<Mutex<Vec<ClientEvent>>>,
    sent_notify: Arc<Notify>,
}

impl ScriptedRelay {
    pub fn new() -> (ScriptedSignaling, ScriptedRelay) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sent_notify = Arc::new(Notify::new());
        (
            ScriptedSignaling {
                incoming: rx,
                sent: sent.clone(),
                sent_notify: sent_notify.clone(),
            },
            ScriptedRelay {
                incoming: tx,
                sent,
                sent_notify,
            },
        )
    }

    /// Deliver an event to the session
    pub fn push(&self, event: RelayEvent) {
        self.incoming.send(event).unwrap();
    }

    /// Everything the session has sent so far
    pub fn sent(&self) -> Vec<ClientEvent> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait until the session has sent at least `count` events
    pub async fn wait_for_sent(&self, count: usize) {
        loop {
            let notified = self.sent_notify.notified();
            if self.sent.lock().unwrap().len() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Drop the connection from the relay side
    pub fn hang_up(self) {}
}

#[async_trait]
impl Signaling for ScriptedSignaling {
    async fn send(&mut self, event: ClientEvent) -> io::Result<()> {
        self.sent.lock().unwrap().push(event);
        self.sent_notify.notify_waiters();
        Ok(())
    }

    async fn next_event(&mut self) -> io::Result<Option<RelayEvent>> {
        Ok(self.incoming.recv().await)
    }

    async fn close(&mut self) {}
}

/// Opens an in-memory channel as soon as an offer is made or accepted
pub struct MemoryNegotiator {
    channel: Option<DirectChannel>,
    hold: bool,
    candidates: Vec<Value>,
    events_tx: mpsc::UnboundedSender<NegotiationEvent>,
    events_rx: mpsc::UnboundedReceiver<NegotiationEvent>,
}

impl MemoryNegotiator {
    /// Returns the negotiator and the remote end of its channel
    pub fn new() -> (Self, DirectChannel) {
        let (local, remote) = memory::pair();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                channel: Some(local),
                hold: false,
                candidates: Vec::new(),
                events_tx,
                events_rx,
            },
            remote,
        )
    }

    /// Never open the channel
    pub fn hold_channel(&mut self) {
        self.hold = true;
    }

    /// Emit `candidate` when negotiation starts
    pub fn with_candidate(&mut self, candidate: Value) {
        self.candidates.push(candidate);
    }

    fn start(&mut self) {
        for candidate in self.candidates.drain(..) {
            let _ = self.events_tx.send(NegotiationEvent::LocalCandidate(candidate));
        }
        if self.hold {
            return;
        }
        if let Some(channel) = self.channel.take() {
            let _ = self.events_tx.send(NegotiationEvent::ChannelOpen(channel));
        }
    }
}

#[async_trait]
impl Negotiator for MemoryNegotiator {
    async fn create_offer(&mut self) -> Result<Value, NegotiationError> {
        self.start();
        Ok(json!({"kind": "memory"}))
    }

    async fn accept_offer(&mut self, _offer: Value) -> Result<Value, NegotiationError> {
        self.start();
        Ok(json!({"kind": "memory"}))
    }

    async fn accept_answer(&mut self, _answer: Value) -> Result<(), NegotiationError> {
        Ok(())
    }

    async fn add_remote_candidate(&mut self, _candidate: Value) -> Result<(), NegotiationError> {
        Ok(())
    }

    async fn next_event(&mut self) -> Option<NegotiationEvent> {
        self.events_rx.recv().await
    }
}
