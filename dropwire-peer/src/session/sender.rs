//! Sending side of a transfer

use std::time::Instant;

use tracing::{debug, info, warn};

use dropwire_common::control::{ChannelMessage, TransferMetadata};
use dropwire_common::link::ShareLink;
use dropwire_common::protocol::{ClientEvent, RelayEvent};
use dropwire_common::validators::generate_room_id;

use super::{
    CLOSE_TIMEOUT, CancelHandle, FLUSH_TIMEOUT, Progress, Reporter, SenderState, SessionEvent, relay_error,
    relay_lost,
};
use crate::channel::{ChannelError, ChannelEvent, DirectChannel};
use crate::chunk::Chunks;
use crate::crypto::{self, SessionKey};
use crate::error::SessionError;
use crate::flow::{FlowConfig, FlowController, ThroughputMeter, percent};
use crate::negotiation::{NegotiationError, NegotiationEvent, Negotiator};
use crate::signaling::Signaling;

/// What to send
#[derive(Debug, Clone)]
pub struct SendRequest {
    /// Name shown to the receiver
    pub file_name: String,
    /// Plaintext file contents
    pub contents: Vec<u8>,
    /// Origin the share link points at
    pub origin: String,
}

/// Summary of a completed send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    pub room_id: String,
    /// Size of the encrypted blob that was streamed
    pub bytes_sent: u64,
}

/// Drives one outbound transfer
pub struct Sender {
    state: SenderState,
    flow: FlowConfig,
    cancel: CancelHandle,
    reporter: Reporter,
    room_id: Option<String>,
}

impl Sender {
    pub fn new(flow: FlowConfig) -> Self {
        Self {
            state: SenderState::Idle,
            flow,
            cancel: CancelHandle::new(),
            reporter: Reporter::default(),
            room_id: None,
        }
    }

    /// Publish session events to `events`
    pub fn with_events(mut self, events: super::EventSender) -> Self {
        self.reporter.events = Some(events);
        self
    }

    /// Handle that cancels this session
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    /// Run the transfer to completion, cancellation or failure
    ///
    /// Relay registration is released on every exit path.
    pub async fn run<S, N>(
        mut self,
        request: SendRequest,
        signaling: &mut S,
        negotiator: &mut N,
    ) -> Result<SendReport, SessionError>
    where
        S: Signaling,
        N: Negotiator,
    {
        let result = self.drive(request, signaling, negotiator).await;

        if let Some(room_id) = self.room_id.take() {
            let _ = signaling.send(ClientEvent::LeaveRoom { room_id }).await;
        }
        signaling.close().await;

        if let Err(e) = &result {
            let terminal = if e.is_cancellation() {
                SenderState::Cancelled
            } else {
                SenderState::Error
            };
            self.enter(terminal).ok();
            if e.is_cancellation() {
                info!("Transfer cancelled");
            } else {
                warn!("Transfer failed: {}", e);
            }
        }
        self.reporter.finished(&result);
        result
    }

    fn enter(&mut self, next: SenderState) -> Result<(), SessionError> {
        self.state.transition(next)?;
        debug!("Sender state: {}", next);
        self.reporter.emit(SessionEvent::SenderState(next));
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::UserCancelled);
        }
        Ok(())
    }

    async fn drive<S, N>(
        &mut self,
        request: SendRequest,
        signaling: &mut S,
        negotiator: &mut N,
    ) -> Result<SendReport, SessionError>
    where
        S: Signaling,
        N: Negotiator,
    {
        self.enter(SenderState::Encrypting)?;
        let key = SessionKey::generate();
        let blob = crypto::encrypt(&request.contents, &key)?;
        drop(request.contents);
        let meta = TransferMetadata::for_file(&request.file_name, blob.len() as u64);
        self.check_cancelled()?;

        let room_id = generate_room_id();
        signaling
            .send(ClientEvent::JoinRoom {
                room_id: room_id.clone(),
            })
            .await
            .map_err(relay_lost)?;
        self.room_id = Some(room_id.clone());
        self.enter(SenderState::AwaitingPeer)?;

        let link = ShareLink::new(&request.origin, room_id.clone(), *key.as_bytes());
        info!("Waiting for a receiver in room {}", room_id);
        self.reporter.emit(SessionEvent::LinkReady(link));

        let mut channel = self.negotiate(&room_id, signaling, negotiator).await?;
        self.enter(SenderState::Transferring)?;

        match self.transfer(&mut channel, &blob, meta).await {
            Ok(()) => {
                // Completion is "done enqueued"; flushing is best-effort.
                if tokio::time::timeout(FLUSH_TIMEOUT, channel.close())
                    .await
                    .is_err()
                {
                    warn!("Timed out flushing the channel");
                }
                self.enter(SenderState::Done)?;
                info!("Sent {} encrypted bytes", blob.len());
                self.reporter.emit(SessionEvent::Completed {
                    bytes: blob.len() as u64,
                    path: None,
                });
                Ok(SendReport {
                    room_id,
                    bytes_sent: blob.len() as u64,
                })
            }
            Err(e) => {
                if e.is_cancellation() {
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
                        debug!("Joined room {} ({} present)", room_id, participants);
                    }
                    Some(RelayEvent::PeerJoined { peer_id, participants }) => {
                        if self.state != SenderState::AwaitingPeer {
                            debug!("Ignoring peer {}: already negotiating", peer_id);
                            continue;
                        }
                        info!("Receiver {} joined ({} in room)", peer_id, participants);
                        self.enter(SenderState::Negotiating)?;
                        let offer = negotiator.create_offer().await?;
                        signaling
                            .send(ClientEvent::Offer {
                                room_id: room_id.to_string(),
                                payload: offer,
                            })
                            .await
                            .map_err(relay_lost)?;
                    }
                    Some(RelayEvent::Answer { payload }) => negotiator.accept_answer(payload).await?,
                    Some(RelayEvent::IceCandidate { payload }) => {
                        negotiator.add_remote_candidate(payload).await?;
                    }
                    Some(RelayEvent::ReceiverReady) => debug!("Receiver ready in room {}", room_id),
                    Some(RelayEvent::PeerLeft { peer_id, participants }) => {
                        warn!("Peer {} left room {} ({} remaining)", peer_id, room_id, participants);
                    }
                    Some(RelayEvent::Offer { .. }) => warn!("Ignoring unexpected offer"),
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

    async fn transfer(
        &mut self,
        channel: &mut DirectChannel,
        blob: &[u8],
        meta: TransferMetadata,
    ) -> Result<(), SessionError> {
        let total = blob.len() as u64;
        let cancel = self.cancel.clone();
        let mut flow = FlowController::new(self.flow);
        let mut meter = ThroughputMeter::new(self.flow.sample_interval, Instant::now());
        let mut sent = 0u64;

        channel.send(ChannelMessage::Meta(meta))?;
        self.report_progress(0, total, 0.0);

        let mut chunks = Chunks::new(blob, flow.chunk_size());
        while chunks.offset() < blob.len() {
            self.check_cancelled()?;
            check_remote(channel)?;
            tokio::select! {
                _ = cancel.cancelled() => return Err(SessionError::UserCancelled),
                _ = flow.ready(|| channel.buffered_amount()) => {}
            }
            chunks.set_chunk_size(flow.chunk_size());
            let Some(chunk) = chunks.next() else {
                break;
            };
            channel.send(ChannelMessage::Chunk(chunk.to_vec()))?;
            sent += chunk.len() as u64;
            if let Some(speed) = meter.record(chunk.len() as u64, Instant::now()) {
                self.report_progress(sent, total, speed);
            }
        }

        channel.send(ChannelMessage::Done)?;
        self.report_progress(total, total, meter.bytes_per_second());
        Ok(())
    }

    fn report_progress(&self, bytes: u64, total: u64, speed: f64) {
        self.reporter.emit(SessionEvent::Progress(Progress {
            bytes,
            total,
            percent: percent(bytes, total),
            speed,
        }));
    }
}

/// Apply anything the receiver has sent while we stream
fn check_remote(channel: &mut DirectChannel) -> Result<(), SessionError> {
    while let Some(event) = channel.try_recv() {
        match event {
            ChannelEvent::Message(ChannelMessage::Cancel) => {
                info!("Receiver cancelled the transfer");
                return Err(SessionError::UserCancelled);
            }
            ChannelEvent::Message(other) => debug!("Ignoring {} from receiver", other.kind()),
            ChannelEvent::Closed => return Err(ChannelError::Closed.into()),
            ChannelEvent::Error(e) => return Err(ChannelError::Transport(e).into()),
        }
    }
    Ok(())
}
