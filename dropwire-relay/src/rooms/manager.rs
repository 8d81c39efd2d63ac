//! Room registry for tracking rooms and their participants
//!
//! Rooms are created by the first join and deleted as soon as the last
//! participant leaves. The periodic reaper only catches rooms that were left
//! empty by a path that bypassed `leave`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::types::{ForwardError, JoinResult, LeaveResult, Room, RoomInfo};
use crate::peers::PeerId;

/// Manages all signaling rooms
#[derive(Clone, Default)]
pub struct RoomRegistry {
    /// Map of room id -> Room
    rooms: Arc<RwLock<HashMap<String, Room>>>,
}

impl RoomRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Join a room, creating it if it doesn't exist
    ///
    /// Rejoining is not an error: the result reports `already_member: true`
    /// and the participant set is unchanged.
    pub async fn join(&self, room_id: &str, peer_id: PeerId) -> JoinResult {
        let mut rooms = self.rooms.write().await;

        let room = rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Room::new(room_id.to_string()));

        let already_member = !room.add_participant(peer_id);

        JoinResult {
            already_member,
            participants: room.len(),
            others: room.others(peer_id),
        }
    }

    /// Leave a room
    ///
    /// Returns None if the peer wasn't a participant or the room doesn't exist.
    pub async fn leave(&self, room_id: &str, peer_id: PeerId) -> Option<LeaveResult> {
        let mut rooms = self.rooms.write().await;

        let room = rooms.get_mut(room_id)?;

        if !room.remove_participant(peer_id) {
            return None;
        }

        let remaining = room.participants.clone();
        let room_deleted = room.is_empty();
        if room_deleted {
            rooms.remove(room_id);
        }

        Some(LeaveResult {
            remaining,
            room_deleted,
        })
    }

    /// Resolve the recipients of a message forwarded by `sender`
    ///
    /// Every participant other than the sender receives the message. The
    /// sender must itself be in the room.
    pub async fn forward(&self, room_id: &str, sender: PeerId) -> Result<Vec<PeerId>, ForwardError> {
        let rooms = self.rooms.read().await;

        let room = rooms.get(room_id).ok_or(ForwardError::NoSuchRoom)?;

        if !room.has_participant(sender) {
            return Err(ForwardError::NotInRoom);
        }

        Ok(room.others(sender))
    }

    /// Remove a peer from all rooms (called on disconnect)
    ///
    /// Returns `(room_id, remaining participants)` for each room the peer was in.
    pub async fn remove_from_all(&self, peer_id: PeerId) -> Vec<(String, Vec<PeerId>)> {
        let mut rooms = self.rooms.write().await;
        let mut left = Vec::new();

        for (key, room) in rooms.iter_mut() {
            if room.remove_participant(peer_id) {
                left.push((key.clone(), room.participants.clone()));
            }
        }

        rooms.retain(|_, room| !room.is_empty());

        left
    }

    /// Delete every room with no participants
    ///
    /// Returns the number of rooms removed.
    pub async fn reap(&self) -> usize {
        let mut rooms = self.rooms.write().await;
        let before = rooms.len();
        rooms.retain(|_, room| !room.is_empty());
        before - rooms.len()
    }

    /// List all rooms, sorted by id
    pub async fn list(&self) -> Vec<RoomInfo> {
        let rooms = self.rooms.read().await;

        let mut infos: Vec<RoomInfo> = rooms
            .values()
            .map(|room| RoomInfo {
                room_id: room.id.clone(),
                participant_count: room.len(),
            })
            .collect();
        infos.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        infos
    }

    /// Number of rooms currently alive
    pub async fn count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Participants of a room, or None if it doesn't exist
    pub async fn participants(&self, room_id: &str) -> Option<Vec<PeerId>> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).map(|room| room.participants.clone())
    }

    /// Insert an empty room directly (for testing the reaper)
    #[cfg(test)]
    pub async fn insert_empty(&self, room_id: &str) {
        let mut rooms = self.rooms.write().await;
        rooms.insert(room_id.to_string(), Room::new(room_id.to_string()));
    }
}
