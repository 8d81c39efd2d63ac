//! Transfer sessions
//!
//! A [`Sender`] and a [`Receiver`] each drive one transfer from start to a
//! terminal state. They talk to the relay through a
//! [`Signaling`](crate::signaling::Signaling) connection, open the direct
//! channel through a [`Negotiator`](crate::negotiation::Negotiator), and
//! report what happens as [`SessionEvent`]s.

mod events;
mod receiver;
mod sender;
mod state;
#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use crate::error::SessionError;

pub use events::{EventSender, Progress, SessionEvent};
pub use receiver::{ReceiveReport, Receiver, Step};
pub use sender::{SendReport, SendRequest, Sender};
pub use state::{ReceiverState, SenderState};

/// How long an aborted session waits for queued channel messages to flush
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a finished sender waits for the receiver to drain its buffer
const FLUSH_TIMEOUT: Duration = Duration::from_secs(60);

/// Cancels a running session from any task
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolve once cancellation has been requested
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Optional event output shared by both sessions
#[derive(Debug, Clone, Default)]
struct Reporter {
    events: Option<EventSender>,
}

impl Reporter {
    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    /// Report how a session ended
    fn finished(&self, result: &Result<impl Sized, SessionError>) {
        match result {
            Ok(_) => {}
            Err(e) if e.is_cancellation() => self.emit(SessionEvent::Cancelled),
            Err(e) => self.emit(SessionEvent::Failed(e.to_string())),
        }
    }
}

/// Map a relay transport failure into a session error
fn relay_lost(err: std::io::Error) -> SessionError {
    SessionError::Room(format!("relay connection failed: {}", err))
}

/// Format an `error` event from the relay
fn relay_error(kind: &str, message: &str, command: Option<&str>) -> SessionError {
    match command {
        Some(command) => SessionError::Room(format!("{} ({}): {}", kind, command, message)),
        None => SessionError::Room(format!("{}: {}", kind, message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let handle = CancelHandle::new();
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.cancelled().await });

        tokio::task::yield_now().await;
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_after_cancel_returns_immediately() {
        let handle = CancelHandle::new();
        handle.cancel();
        handle.cancel();
        tokio::time::timeout(Duration::from_millis(100), handle.cancelled())
            .await
            .unwrap();
    }

    #[test]
    fn test_relay_error_format() {
        let err = relay_error("invalid_room", "room id too long", Some("join-room"));
        assert_eq!(
            err.to_string(),
            "relay error: invalid_room (join-room): room id too long"
        );
    }
}
