//! Direct-channel message types
//!
//! Traffic on an open peer channel is either a JSON control message
//! (`meta`, `done`, `cancel`) sent as text, or a raw chunk of the encrypted
//! blob sent as binary. [`ChannelMessage`] is decoded once from a [`Frame`]
//! at the channel boundary so session code only ever matches on variants.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::framing::Frame;

/// Suffix appended to the original file name for the encrypted payload
pub const ENCRYPTED_SUFFIX: &str = ".enc";

/// Name used when neither metadata field yields a usable name
pub const FALLBACK_FILENAME: &str = "file";

/// Describes the blob that is about to be streamed
///
/// Sent exactly once, before the first chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMetadata {
    /// Name of the encrypted payload (`<original>.enc`)
    pub filename: String,
    /// Name of the file before encryption
    #[serde(rename = "originalName", default)]
    pub original_name: String,
    /// Total size in bytes of the encrypted blob
    pub size: u64,
}

impl TransferMetadata {
    /// Metadata for an encrypted blob of `size` bytes made from `original_name`
    #[must_use]
    pub fn for_file(original_name: &str, size: u64) -> Self {
        Self {
            filename: format!("{}{}", original_name, ENCRYPTED_SUFFIX),
            original_name: original_name.to_string(),
            size,
        }
    }

    /// Name the receiver should save the decrypted file under
    ///
    /// Prefers the original name, then the encrypted name with its suffix
    /// stripped, then [`FALLBACK_FILENAME`].
    #[must_use]
    pub fn save_name(&self) -> &str {
        if !self.original_name.is_empty() {
            return &self.original_name;
        }
        let stripped = self
            .filename
            .strip_suffix(ENCRYPTED_SUFFIX)
            .unwrap_or(&self.filename);
        if stripped.is_empty() {
            FALLBACK_FILENAME
        } else {
            stripped
        }
    }
}

/// Wire form of the text control messages
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ControlMessage {
    Meta(TransferMetadata),
    Done,
    Cancel,
}

/// A decoded direct-channel message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    /// Transfer metadata
    Meta(TransferMetadata),
    /// Sender has enqueued every chunk
    Done,
    /// Sender or receiver aborted the transfer
    Cancel,
    /// One chunk of the encrypted blob
    Chunk(Vec<u8>),
}

/// A text frame that is not a known control message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownControl(pub String);

impl fmt::Display for UnknownControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized control message: {}", self.0)
    }
}

impl std::error::Error for UnknownControl {}

impl ChannelMessage {
    /// Encode into the frame that carries this message
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let control = match self {
            Self::Chunk(bytes) => return Frame::Binary(bytes.clone()),
            Self::Meta(meta) => ControlMessage::Meta(meta.clone()),
            Self::Done => ControlMessage::Done,
            Self::Cancel => ControlMessage::Cancel,
        };
        // Serializing these variants cannot fail: every field is a string or integer.
        Frame::Text(serde_json::to_string(&control).unwrap_or_default())
    }

    /// Encode into a frame, moving chunk bytes instead of copying them
    #[must_use]
    pub fn into_frame(self) -> Frame {
        match self {
            Self::Chunk(bytes) => Frame::Binary(bytes),
            other => other.to_frame(),
        }
    }

    /// Decode a received frame
    ///
    /// # Errors
    ///
    /// Returns [`UnknownControl`] if a text frame is not a valid control message.
    pub fn from_frame(frame: Frame) -> Result<Self, UnknownControl> {
        match frame {
            Frame::Binary(bytes) => Ok(Self::Chunk(bytes)),
            Frame::Text(text) => match serde_json::from_str::<ControlMessage>(&text) {
                Ok(ControlMessage::Meta(meta)) => Ok(Self::Meta(meta)),
                Ok(ControlMessage::Done) => Ok(Self::Done),
                Ok(ControlMessage::Cancel) => Ok(Self::Cancel),
                Err(_) => Err(UnknownControl(text)),
            },
        }
    }

    /// Short name for logging
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Meta(_) => "meta",
            Self::Done => "done",
            Self::Cancel => "cancel",
            Self::Chunk(_) => "chunk",
        }
    }
}
