//! Shareable download links
//!
//! A link carries everything a receiver needs and nothing the relay sees:
//!
//! ```text
//! <origin>/download/<roomId>?key=<base64 key, percent-encoded>
//! ```
//!
//! The key is standard base64 of the 256-bit session key, escaped the way
//! `encodeURIComponent` escapes it so links interoperate with browser peers.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use thiserror::Error;

use crate::validators::{RoomIdError, validate_room_id};

/// Size of a session key in bytes
pub const KEY_SIZE: usize = 32;

/// Path segment that precedes the room id
const DOWNLOAD_SEGMENT: &str = "/download/";

/// Query parameter carrying the key
const KEY_PARAM: &str = "key";

/// Characters `encodeURIComponent` leaves untouched
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Errors from parsing a share link
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("link has no /download/<room> path")]
    MissingRoom,
    #[error("invalid room id in link: {0}")]
    InvalidRoom(RoomIdError),
    #[error("link has no key parameter")]
    MissingKey,
    #[error("key is not valid base64")]
    InvalidKeyEncoding,
    #[error("key must be 32 bytes, got {0}")]
    InvalidKeyLength(usize),
}

/// A parsed share link
#[derive(Clone, PartialEq, Eq)]
pub struct ShareLink {
    /// Scheme and authority the link points at (no trailing slash)
    pub origin: String,
    /// Room the sender is waiting in
    pub room_id: String,
    /// Session key for the encrypted blob
    pub key: [u8; KEY_SIZE],
}

impl ShareLink {
    /// Build a link for `room_id` under `origin`
    pub fn new(origin: &str, room_id: impl Into<String>, key: [u8; KEY_SIZE]) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            room_id: room_id.into(),
            key,
        }
    }

    /// The key as standard base64
    #[must_use]
    pub fn encoded_key(&self) -> String {
        STANDARD.encode(self.key)
    }

    /// Parse a link
    ///
    /// # Errors
    ///
    /// Returns a [`LinkError`] describing the first problem found.
    pub fn parse(link: &str) -> Result<Self, LinkError> {
        let link = link.trim();
        let (origin, rest) = link.split_once(DOWNLOAD_SEGMENT).ok_or(LinkError::MissingRoom)?;
        let (room_id, query) = rest.split_once('?').unwrap_or((rest, ""));
        let room_id = room_id.trim_end_matches('/');
        validate_room_id(room_id).map_err(LinkError::InvalidRoom)?;

        let raw_key = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(name, _)| *name == KEY_PARAM)
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
            .ok_or(LinkError::MissingKey)?;

        let decoded = percent_decode_str(raw_key)
            .decode_utf8()
            .map_err(|_| LinkError::InvalidKeyEncoding)?;
        let bytes = STANDARD
            .decode(decoded.as_bytes())
            .map_err(|_| LinkError::InvalidKeyEncoding)?;
        let key: [u8; KEY_SIZE] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| LinkError::InvalidKeyLength(bytes.len()))?;

        Ok(Self::new(origin, room_id, key))
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self.encoded_key();
        write!(
            f,
            "{}{}{}?{}={}",
            self.origin,
            DOWNLOAD_SEGMENT,
            self.room_id,
            KEY_PARAM,
            utf8_percent_encode(&key, COMPONENT)
        )
    }
}

impl fmt::Debug for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareLink")
            .field("origin", &self.origin)
            .field("room_id", &self.room_id)
            .field("key", &"[REDACTED]")
            .finish()
    }
}
