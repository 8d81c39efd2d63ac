//! Session state machines
//!
//! Each side of a transfer moves through a fixed sequence of states with
//! `Cancelled` and `Error` reachable from any non-terminal state. Any other
//! transition is rejected.

use std::fmt;

use crate::error::SessionError;

/// Sender lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    Idle,
    Encrypting,
    AwaitingPeer,
    Negotiating,
    Transferring,
    Done,
    Cancelled,
    Error,
}

impl SenderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Encrypting => "encrypting",
            Self::AwaitingPeer => "awaiting-peer",
            Self::Negotiating => "negotiating",
            Self::Transferring => "transferring",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Error)
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Self::Cancelled | Self::Error)
                | (Self::Idle, Self::Encrypting)
                | (Self::Encrypting, Self::AwaitingPeer)
                | (Self::AwaitingPeer, Self::Negotiating)
                | (Self::Negotiating, Self::Transferring)
                | (Self::Transferring, Self::Done)
        )
    }

    /// Move to `next`, or fail without changing state
    pub fn transition(&mut self, next: Self) -> Result<(), SessionError> {
        if !self.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.as_str(),
                to: next.as_str(),
            });
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for SenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Waiting,
    Connecting,
    Receiving,
    Decrypting,
    Done,
    Cancelled,
    Error,
}

impl ReceiverState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Connecting => "connecting",
            Self::Receiving => "receiving",
            Self::Decrypting => "decrypting",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Error)
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Self::Cancelled | Self::Error)
                | (Self::Waiting, Self::Connecting)
                | (Self::Connecting, Self::Receiving)
                | (Self::Receiving, Self::Decrypting)
                | (Self::Decrypting, Self::Done)
        )
    }

    /// Move to `next`, or fail without changing state
    pub fn transition(&mut self, next: Self) -> Result<(), SessionError> {
        if !self.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.as_str(),
                to: next.as_str(),
            });
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for ReceiverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_happy_path() {
        let mut state = SenderState::Idle;
        for next in [
            SenderState::Encrypting,
            SenderState::AwaitingPeer,
            SenderState::Negotiating,
            SenderState::Transferring,
            SenderState::Done,
        ] {
            state.transition(next).unwrap();
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_sender_rejects_skipping() {
        let mut state = SenderState::AwaitingPeer;
        let err = state.transition(SenderState::Transferring).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                from: "awaiting-peer",
                to: "transferring"
            }
        ));
        assert_eq!(state, SenderState::AwaitingPeer);
    }

    #[test]
    fn test_cancel_from_any_live_state() {
        for state in [
            SenderState::Idle,
            SenderState::Encrypting,
            SenderState::AwaitingPeer,
            SenderState::Negotiating,
            SenderState::Transferring,
        ] {
            assert!(state.can_transition_to(SenderState::Cancelled));
            assert!(state.can_transition_to(SenderState::Error));
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        for state in [SenderState::Done, SenderState::Cancelled, SenderState::Error] {
            assert!(!state.can_transition_to(SenderState::Cancelled));
            assert!(!state.can_transition_to(SenderState::Idle));
        }
        for state in [
            ReceiverState::Done,
            ReceiverState::Cancelled,
            ReceiverState::Error,
        ] {
            assert!(!state.can_transition_to(ReceiverState::Error));
        }
    }

    #[test]
    fn test_receiver_happy_path() {
        let mut state = ReceiverState::Waiting;
        for next in [
            ReceiverState::Connecting,
            ReceiverState::Receiving,
            ReceiverState::Decrypting,
            ReceiverState::Done,
        ] {
            state.transition(next).unwrap();
        }
        assert_eq!(state.to_string(), "done");
    }

    #[test]
    fn test_receiver_rejects_backwards() {
        let mut state = ReceiverState::Receiving;
        assert!(state.transition(ReceiverState::Connecting).is_err());
    }
}
