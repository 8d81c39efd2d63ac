//! Negotiation of a direct channel
//!
//! Sessions treat negotiation as a black box: produce an offer, answer an
//! offer, apply the remote answer, feed in remote candidates, and wait for
//! local candidates or an open channel. The relay carries every payload
//! verbatim, so any [`Negotiator`] works with any relay.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::channel::DirectChannel;

/// Errors from a negotiator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },
    #[error("session token mismatch")]
    TokenMismatch,
    #[error("{0} received out of order")]
    OutOfOrder(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Output of a running negotiation
pub enum NegotiationEvent {
    /// A candidate to trickle to the remote peer
    LocalCandidate(Value),
    /// The direct channel is ready
    ChannelOpen(DirectChannel),
    /// Negotiation cannot complete
    Failed(NegotiationError),
}

impl std::fmt::Debug for NegotiationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LocalCandidate(candidate) => {
                f.debug_tuple("LocalCandidate").field(candidate).finish()
            }
            Self::ChannelOpen(_) => f.write_str("ChannelOpen"),
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

/// Offer/answer/candidate primitives with an open signal
#[async_trait]
pub trait Negotiator: Send {
    /// Start negotiating as the offering side
    async fn create_offer(&mut self) -> Result<Value, NegotiationError>;

    /// Apply a remote offer and produce the answer
    async fn accept_offer(&mut self, offer: Value) -> Result<Value, NegotiationError>;

    /// Apply the remote answer to our offer
    async fn accept_answer(&mut self, answer: Value) -> Result<(), NegotiationError>;

    /// Apply a candidate trickled by the remote peer
    async fn add_remote_candidate(&mut self, candidate: Value) -> Result<(), NegotiationError>;

    /// Wait for the next negotiation event
    ///
    /// Must be cancel safe; sessions poll it inside `select!`. Returns `None`
    /// once no further events can occur.
    async fn next_event(&mut self) -> Option<NegotiationEvent>;
}
