//! Room types
//!
//! This module contains the core data structures used by the room registry.

use crate::peers::PeerId;

/// State for a single room
#[derive(Debug, Clone)]
pub struct Room {
    /// Room id chosen by the sender
    pub id: String,
    /// Participants in join order
    pub participants: Vec<PeerId>,
}

impl Room {
    /// Create a new, empty room
    pub fn new(id: String) -> Self {
        Self {
            id,
            participants: Vec::new(),
        }
    }

    /// Check if the room is empty
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Number of participants
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Check if a peer is in this room
    pub fn has_participant(&self, peer_id: PeerId) -> bool {
        self.participants.contains(&peer_id)
    }

    /// Add a participant, returning false if already present
    pub fn add_participant(&mut self, peer_id: PeerId) -> bool {
        if self.has_participant(peer_id) {
            return false;
        }
        self.participants.push(peer_id);
        true
    }

    /// Remove a participant, returning false if absent
    pub fn remove_participant(&mut self, peer_id: PeerId) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| *p != peer_id);
        self.participants.len() != before
    }

    /// Participants other than `peer_id`
    pub fn others(&self, peer_id: PeerId) -> Vec<PeerId> {
        self.participants
            .iter()
            .copied()
            .filter(|p| *p != peer_id)
            .collect()
    }
}

/// Result of joining a room
#[derive(Debug)]
pub struct JoinResult {
    /// Whether the peer was already a participant
    pub already_member: bool,
    /// Participant count after the join
    pub participants: usize,
    /// Everyone else in the room (for the peer-joined notice)
    pub others: Vec<PeerId>,
}

/// Result of leaving a room
#[derive(Debug)]
pub struct LeaveResult {
    /// Remaining participants (for the peer-left notice)
    pub remaining: Vec<PeerId>,
    /// Whether the room was deleted because it became empty
    pub room_deleted: bool,
}

/// Why a message could not be forwarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardError {
    /// Room does not exist
    NoSuchRoom,
    /// Room exists but the sender is not in it
    NotInRoom,
}

/// Info about a room for the diagnostics listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: String,
    pub participant_count: usize,
}
