//! In-process channel pair

use crate::channel::{DirectChannel, spawn_stream_channel};

/// Bytes the in-memory pipe holds before writers wait
const PIPE_CAPACITY: usize = 1024 * 1024;

/// Two connected channels backed by an in-memory pipe
pub fn pair() -> (DirectChannel, DirectChannel) {
    let (a, b) = tokio::io::duplex(PIPE_CAPACITY);
    (spawn_stream_channel(a), spawn_stream_channel(b))
}
