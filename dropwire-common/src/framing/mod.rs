//! Binary framing for direct peer channels
//!
//! A direct channel carries two kinds of message: JSON control text and raw
//! binary chunks. On a byte stream each message is written as:
//!
//! ```text
//! <tag:u8><length:u32 big-endian><payload>
//! ```
//!
//! where tag `0` is UTF-8 text and tag `1` is binary.

mod reader;
mod writer;

use std::fmt;
use std::io;

pub use reader::FrameReader;
pub use writer::FrameWriter;

/// Tag byte for text frames
pub const TAG_TEXT: u8 = 0;

/// Tag byte for binary frames
pub const TAG_BINARY: u8 = 1;

/// Size of the frame header (tag + length)
pub const HEADER_SIZE: usize = 5;

/// Largest payload a single frame may carry (16 MB)
///
/// Well above any chunk size a sender uses; bounds allocation on a hostile peer.
pub const MAX_FRAME_PAYLOAD: usize = 16 * 1024 * 1024;

/// A single message on a direct channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 control text
    Text(String),
    /// Opaque bytes
    Binary(Vec<u8>),
}

impl Frame {
    /// Number of payload bytes carried by this frame
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    /// Whether this frame has an empty payload
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Errors produced while reading or writing frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Underlying stream failed
    Io(String),
    /// Stream closed in the middle of a frame
    ConnectionClosed,
    /// Tag byte was neither text nor binary
    UnknownTag(u8),
    /// Declared payload length exceeds [`MAX_FRAME_PAYLOAD`]
    PayloadTooLarge(usize),
    /// Text frame payload was not valid UTF-8
    InvalidUtf8,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
            Self::ConnectionClosed => write!(f, "connection closed mid-frame"),
            Self::UnknownTag(tag) => write!(f, "unknown frame tag: {}", tag),
            Self::PayloadTooLarge(len) => {
                write!(f, "frame payload too large: {} bytes (max {})", len, MAX_FRAME_PAYLOAD)
            }
            Self::InvalidUtf8 => write!(f, "text frame is not valid UTF-8"),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<io::Error> for FrameError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::ConnectionClosed
        } else {
            Self::Io(err.to_string())
        }
    }
}

impl From<FrameError> for io::Error {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(msg) => io::Error::other(msg),
            FrameError::ConnectionClosed => {
                io::Error::new(io::ErrorKind::ConnectionReset, "connection closed")
            }
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}
