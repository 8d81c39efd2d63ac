//! Direct peer channel
//!
//! A [`DirectChannel`] is the ordered, reliable pipe between sender and
//! receiver once negotiation succeeds. Outgoing messages are queued and
//! written by a background task, so [`DirectChannel::buffered_amount`]
//! reports the bytes accepted but not yet written. Incoming frames are
//! decoded into [`ChannelMessage`] once, here, before sessions see them.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use dropwire_common::control::ChannelMessage;
use dropwire_common::framing::{Frame, FrameReader, FrameWriter};

/// Errors from a direct channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("protocol violation: {0}")]
    Protocol(String),
}

/// Something that happened on the inbound side of a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Message(ChannelMessage),
    /// Remote side closed the channel cleanly
    Closed,
    /// Transport failed; no further events follow
    Error(String),
}

/// An open channel to the remote peer
pub struct DirectChannel {
    outbound: Option<mpsc::UnboundedSender<Frame>>,
    inbound: mpsc::UnboundedReceiver<ChannelEvent>,
    buffered: Arc<AtomicUsize>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
    finished: bool,
}

impl DirectChannel {
    /// Queue a message for the remote peer
    pub fn send(&self, message: ChannelMessage) -> Result<(), ChannelError> {
        let outbound = self.outbound.as_ref().ok_or(ChannelError::Closed)?;
        let frame = message.into_frame();
        let len = frame.len();
        self.buffered.fetch_add(len, Ordering::SeqCst);
        outbound.send(frame).map_err(|_| {
            self.buffered.fetch_sub(len, Ordering::SeqCst);
            ChannelError::Closed
        })
    }

    /// Bytes queued but not yet written to the transport
    pub fn buffered_amount(&self) -> usize {
        self.buffered.load(Ordering::SeqCst)
    }

    /// Wait for the next inbound event
    ///
    /// After `Closed` or `Error` every further call returns `Closed`.
    /// Cancel safe.
    pub async fn recv(&mut self) -> ChannelEvent {
        if self.finished {
            return ChannelEvent::Closed;
        }
        let event = self.inbound.recv().await.unwrap_or(ChannelEvent::Closed);
        if !matches!(event, ChannelEvent::Message(_)) {
            self.finished = true;
        }
        event
    }

    /// Take an inbound event if one is already waiting
    pub fn try_recv(&mut self) -> Option<ChannelEvent> {
        if self.finished {
            return None;
        }
        let event = self.inbound.try_recv().ok()?;
        if !matches!(event, ChannelEvent::Message(_)) {
            self.finished = true;
        }
        Some(event)
    }

    /// Flush queued messages and close the channel
    pub async fn close(mut self) {
        self.outbound.take();
        if let Some(writer) = self.writer.take() {
            let _ = writer.await;
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl Drop for DirectChannel {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Run a channel over any byte stream
///
/// Spawns one task writing queued frames and one decoding inbound frames.
pub fn spawn_stream_channel<S>(stream: S) -> DirectChannel
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let buffered = Arc::new(AtomicUsize::new(0));

    let writer = tokio::spawn(write_loop(FrameWriter::new(write_half), out_rx, buffered.clone()));
    let reader = tokio::spawn(read_loop(FrameReader::new(read_half), in_tx));

    DirectChannel {
        outbound: Some(out_tx),
        inbound: in_rx,
        buffered,
        writer: Some(writer),
        reader: Some(reader),
        finished: false,
    }
}

async fn write_loop<W>(
    mut writer: FrameWriter<W>,
    mut frames: mpsc::UnboundedReceiver<Frame>,
    buffered: Arc<AtomicUsize>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = frames.recv().await {
        let result = writer.write_frame(&frame).await;
        buffered.fetch_sub(frame.len(), Ordering::SeqCst);
        if let Err(e) = result {
            debug!("Channel write failed: {}", e);
            // Release anything still queued so senders do not wait forever
            frames.close();
            while let Some(frame) = frames.recv().await {
                buffered.fetch_sub(frame.len(), Ordering::SeqCst);
            }
            return;
        }
    }
    let _ = writer.shutdown().await;
}

async fn read_loop<R>(mut reader: FrameReader<R>, events: mpsc::UnboundedSender<ChannelEvent>)
where
    R: AsyncRead + Unpin,
{
    loop {
        let event = match reader.read_frame().await {
            Ok(Some(frame)) => match ChannelMessage::from_frame(frame) {
                Ok(message) => ChannelEvent::Message(message),
                Err(unknown) => {
                    warn!("Ignoring {}", unknown);
                    continue;
                }
            },
            Ok(None) => ChannelEvent::Closed,
            Err(e) => ChannelEvent::Error(e.to_string()),
        };
        let last = !matches!(event, ChannelEvent::Message(_));
        if events.send(event).is_err() || last {
            return;
        }
    }
}
