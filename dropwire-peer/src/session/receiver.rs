//! Receiving side of a transfer
//!
//! The message handling is a plain state machine ([`Receiver::on_message`])
//! so it can be exercised without any transport; [`Receiver::run`] wires it
//! to a relay connection, a negotiator and a [`FileSink`].

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info, warn};

use dropwire_common::control::{ChannelMessage, TransferMetadata};
use dropwire_common::link::ShareLink;
use dropwire_common::protocol::{ClientEvent, RelayEvent};

use super::{
    CLOSE_TIMEOUT, CancelHandle, EventSender, Progress, ReceiverState, Reporter, SessionEvent,
    relay_error, relay_lost,
};
use crate::channel::{ChannelError, ChannelEvent, DirectChannel};
use crate::chunk::Reassembler;
use crate::crypto::{self, SessionKey};
use crate::error::SessionError;
use crate::flow::{FlowConfig, ThroughputMeter, pending_percent};
use crate::negotiation::{NegotiationError, NegotiationEvent, Negotiator};
use crate::signaling::Signaling;
use crate::sink::FileSink;

/// Outcome of handling one channel message
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// Keep receiving
    Continue,
    /// Blob verified and decrypted
    Complete {
        meta: TransferMetadata,
        plaintext: Vec<u8>,
    },
}

/// Summary of a completed receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveReport {
    /// Where the decrypted file was written
    pub path: PathBuf,
    /// Size of the decrypted file
    pub bytes: u64,
}

/// Drives one inbound transfer
pub struct Receiver {
    state: ReceiverState,
    key: SessionKey,
    cancel: CancelHandle,
    reporter: Reporter,
    channel_open: bool,
    meta: Option<TransferMetadata>,
    reassembler: Option<Reassembler>,
    meter: ThroughputMeter,
}

impl Receiver {
    pub fn new(key: SessionKey, flow: FlowConfig) -> Self {
        Self {
            state: ReceiverState::Waiting,
            key,
            cancel: CancelHandle::new(),
            reporter: Reporter::default(),
            channel_open: false,
            meta: None,
            reassembler: None,
            meter: ThroughputMeter::new(flow.sample_interval, Instant::now()),
        }
    }

    /// Publish session events to `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.reporter.events = Some(events);
        self
    }

    /// Handle that cancels this session
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// Metadata announced by the sender, once received
    pub fn metadata(&self) -> Option<&TransferMetadata> {
        self.meta.as_ref()
    }

    fn enter(&mut self, next: ReceiverState) -> Result<(), SessionError> {
        self.state.transition(next)?;
        debug!("Receiver state: {}", next);
        self.reporter.emit(SessionEvent::ReceiverState(next));
        Ok(())
    }

    /// Move to the terminal state matching `err`
    fn abort(&mut self, err: &SessionError) {
        if self.state.is_terminal() {
            return;
        }
        self.meta = None;
        self.reassembler = None;
        let terminal = if err.is_cancellation() {
            ReceiverState::Cancelled
        } else {
            ReceiverState::Error
        };
        self.enter(terminal).ok();
    }

    /// Relay connection is up and the room joined
    pub fn on_joined(&mut self) -> Result<(), SessionError> {
        self.enter(ReceiverState::Connecting)
    }

    /// The direct channel reported open
    pub fn on_channel_open(&mut self) -> Result<(), SessionError> {
        self.channel_open = true;
        if self.meta.is_some() && self.state == ReceiverState::Connecting {
            self.enter(ReceiverState::Receiving)?;
        }
        Ok(())
    }

    /// Handle one message from the sender
    ///
    /// Errors leave the receiver in `Cancelled` or `Error`.
    pub fn on_message(
        &mut self,
        message: ChannelMessage,
        now: Instant,
    ) -> Result<Step, SessionError> {
        let result = self.handle_message(message, now);
        if let Err(e) = &result {
            self.abort(e);
        }
        result
    }

    fn handle_message(
        &mut self,
        message: ChannelMessage,
        now: Instant,
    ) -> Result<Step, SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::UserCancelled);
        }
        if self.state.is_terminal() {
            return Err(ChannelError::Protocol(format!(
                "{} after transfer ended",
                message.kind()
            ))
            .into());
        }

        match message {
            ChannelMessage::Meta(meta) => {
                if self.meta.is_some() {
                    warn!("Ignoring duplicate metadata");
                    return Ok(Step::Continue);
                }
                info!(
                    "Receiving {} ({} encrypted bytes)",
                    meta.save_name(),
                    meta.size
                );
                let total = meta.size;
                self.reassembler = Some(Reassembler::new(total));
                self.meta = Some(meta);
                if self.channel_open {
                    self.enter(ReceiverState::Receiving)?;
                }
                self.report_progress(0, total, 0.0);
                Ok(Step::Continue)
            }
            ChannelMessage::Chunk(bytes) => {
                let Some(reassembler) = self.reassembler.as_mut() else {
                    warn!("Dropping {}-byte chunk received before metadata", bytes.len());
                    return Ok(Step::Continue);
                };
                reassembler.push(&bytes)?;
                let (received, total) = (reassembler.received(), reassembler.expected());
                if let Some(speed) = self.meter.record(bytes.len() as u64, now) {
                    self.report_progress(received, total, speed);
                }
                Ok(Step::Continue)
            }
            ChannelMessage::Done => {
                let (Some(meta), Some(reassembler)) = (self.meta.take(), self.reassembler.take())
                else {
                    return Err(ChannelError::Protocol("done before metadata".to_string()).into());
                };
                self.enter(ReceiverState::Decrypting)?;
                let blob = reassembler.finish()?;
                let plaintext = crypto::decrypt(&blob, &self.key)?;
                Ok(Step::Complete { meta, plaintext })
            }
            ChannelMessage::Cancel => {
                info!("Sender cancelled the transfer");
                Err(SessionError::UserCancelled)
            }
        }
    }

    /// The decrypted file has been handed off
    pub fn on_saved(&mut self, bytes: u64, path: Option<PathBuf>) -> Result<(), SessionError> {
        self.enter(ReceiverState::Done)?;
        self.reporter.emit(SessionEvent::Progress(Progress {
            bytes,
            total: bytes,
            percent: 100.0,
            speed: self.meter.bytes_per_second(),
        }));
        self.reporter.emit(SessionEvent::Completed { bytes, path });
        Ok(())
    }

    fn report_progress(&self, received: u64, total: u64, speed: f64) {
        self.reporter.emit(SessionEvent::Progress(Progress {
            bytes: received,
            total,
            percent: pending_percent(received, total),
            speed,
        }));
    }

    /// Receive the file behind `link` into `sink`
    ///
    /// Relay registration is released on every exit path.
    pub async fn run<S, N, F>(
        mut self,
        link: &ShareLink,
        signaling: &mut S,
        negotiator: &mut N,
        sink: &mut F,
    ) -> Result<ReceiveReport, SessionError>
    where
        S: Signaling,
        N: Negotiator,
        F: FileSink,
    {
        let room_id = link.room_id.clone();
        let mut joined = false;
        let result = self
            .drive(&room_id, &mut joined, signaling, negotiator, sink)
            .await;

        if joined {
            let _ = signaling.send(ClientEvent::LeaveRoom { room_id }).await;
        }
        signaling.close().await;

        if let Err(e) = &result {
            self.abort(e);
            if e.is_cancellation() {
                info!("Transfer cancelled");
            } else {
                warn!("Transfer failed: {}", e);
            }
        }
        self.reporter.finished(&result);
        result
    }

    async fn drive<S, N, F>(
        &mut self,
        room_id: &str,
        joined: &mut bool,
        signaling: &mut S,
        negotiator: &mut N,
        sink: &mut F,
    ) -> Result<ReceiveReport, SessionError>
    where
        S: Signaling,
        N: Negotiator,
        F: FileSink,
    {
        signaling
            .send(ClientEvent::JoinRoom {
                room_id: room_id.to_string(),
            })
            .await
            .map_err(relay_lost)?;
        *joined = true;
        self.on_joined()?;
        signaling
            .send(ClientEvent::ReceiverReady {
                room_id: room_id.to_string(),
            })
            .await
            .map_err(relay_lost)?;

        let mut channel = self.negotiate(room_id, signaling, negotiator).await?;
        self.on_channel_open()?;

        match self.receive(&mut channel).await {
            Ok((meta, plaintext)) => {
                channel.close().await;
                let path = sink.save(meta.save_name(), &plaintext).await?;
                let bytes = plaintext.len() as u64;
                info!("Saved {} bytes to {}", bytes, path.display());
                self.on_saved(bytes, Some(path.clone()))?;
                Ok(ReceiveReport { path, bytes })
            }
            Err(e) => {
                if self.cancel.is_cancelled() {
                    let _ = channel.send(ChannelMessage::Cancel);
                }
                let _ = tokio::time::timeout(CLOSE_TIMEOUT, channel.close()).await;
                Err(e)
            }
        }
    }

    async fn negotiate<S, N>(
        &mut self,
        room_id: &str,
        signaling: &mut S,
        negotiator: &mut N,
    ) -> Result<DirectChannel, SessionError>
    where
        S: Signaling,
        N: Negotiator,
    {
        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(SessionError::UserCancelled),
                event = signaling.next_event() => match event.map_err(relay_lost)? {
                    Some(RelayEvent::Joined { participants, .. }) => {
                        info!("Joined room {} ({} present)", room_id, participants);
                    }
                    Some(RelayEvent::Offer { payload }) => {
                        let answer = negotiator.accept_offer(payload).await?;
                        signaling
                            .send(ClientEvent::Answer {
                                room_id: room_id.to_string(),
                                payload: answer,
                            })
                            .await
                            .map_err(relay_lost)?;
                    }
                    Some(RelayEvent::IceCandidate { payload }) => {
                        negotiator.add_remote_candidate(payload).await?;
                    }
                    Some(RelayEvent::PeerLeft { peer_id, .. }) => {
                        return Err(SessionError::Room(format!(
                            "sender {} left before connecting",
                            peer_id
                        )));
                    }
                    Some(RelayEvent::PeerJoined { peer_id, .. }) => {
                        debug!("Peer {} joined room {}", peer_id, room_id);
                    }
                    Some(RelayEvent::ReceiverReady) => debug!("Another receiver is ready"),
                    Some(RelayEvent::Answer { .. }) => warn!("Ignoring unexpected answer"),
                    Some(RelayEvent::Error { kind, message, command }) => {
                        return Err(relay_error(&kind, &message, command.as_deref()));
                    }
                    None => return Err(SessionError::Room("relay closed the connection".to_string())),
                },
                event = negotiator.next_event() => match event {
                    Some(NegotiationEvent::LocalCandidate(payload)) => {
                        signaling
                            .send(ClientEvent::IceCandidate {
                                room_id: room_id.to_string(),
                                payload,
                            })
                            .await
                            .map_err(relay_lost)?;
                    }
                    Some(NegotiationEvent::ChannelOpen(channel)) => return Ok(channel),
                    Some(NegotiationEvent::Failed(e)) => return Err(e.into()),
                    None => {
                        return Err(NegotiationError::Transport("negotiator stopped".to_string()).into());
                    }
                },
            }
        }
    }

    async fn receive(
        &mut self,
        channel: &mut DirectChannel,
    ) -> Result<(TransferMetadata, Vec<u8>), SessionError> {
        let cancel = self.cancel.clone();
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => return Err(SessionError::UserCancelled),
                event = channel.recv() => event,
            };
            match event {
                ChannelEvent::Message(message) => {
                    if let Step::Complete { meta, plaintext } =
                        self.on_message(message, Instant::now())?
                    {
                        return Ok((meta, plaintext));
                    }
                }
                ChannelEvent::Closed => return Err(ChannelError::Closed.into()),
                ChannelEvent::Error(e) => return Err(ChannelError::Transport(e).into()),
            }
        }
    }
}
