//! Events a session reports while it runs

use std::path::PathBuf;

use dropwire_common::link::ShareLink;

use super::state::{ReceiverState, SenderState};

/// A progress sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Bytes moved so far
    pub bytes: u64,
    /// Total bytes expected
    pub total: u64,
    /// Completion percentage, 0.0 to 100.0
    pub percent: f64,
    /// Latest throughput sample in bytes per second
    pub speed: f64,
}

/// Something a running session wants its front end to know
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SenderState(SenderState),
    ReceiverState(ReceiverState),
    /// The share link to hand to the receiver
    LinkReady(ShareLink),
    Progress(Progress),
    /// Transfer finished; `path` is where the receiver saved the file
    Completed { bytes: u64, path: Option<PathBuf> },
    Failed(String),
    Cancelled,
}

/// Where sessions publish their events
pub type EventSender = tokio::sync::mpsc::UnboundedSender<SessionEvent>;
