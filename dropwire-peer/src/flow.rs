//! Flow control and throughput measurement
//!
//! The sender paces writes against the channel's buffered byte count:
//! above the threshold it backs off briefly, otherwise it writes a burst of
//! chunks and then yields to the scheduler. A buffer that stays full halves
//! the chunk size; bursts that go through without backing off grow it back
//! toward the configured size. Both sides sample throughput at a fixed
//! interval.

use std::time::{Duration, Instant};

const KIB: usize = 1024;

/// Delay before re-checking a full send buffer
pub const BACKOFF_DELAY: Duration = Duration::from_millis(10);

/// Smallest chunk the controller shrinks to
pub const MIN_CHUNK_SIZE: usize = 16 * KIB;

/// Consecutive backoffs before the chunk size is halved
const SHRINK_AFTER_BACKOFFS: u32 = 50;

/// Consecutive bursts without a backoff before the chunk size is doubled
const GROW_AFTER_BURSTS: u32 = 4;

/// Highest percentage reported before the transfer is verified
pub const MAX_PENDING_PERCENT: f64 = 99.0;

/// Named flow settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FlowProfile {
    /// Large chunks and a deep buffer
    #[default]
    Standard,
    /// Small chunks for constrained links
    Conservative,
}

impl FlowProfile {
    /// Settings for this profile
    #[must_use]
    pub fn config(self) -> FlowConfig {
        match self {
            Self::Standard => FlowConfig::standard(),
            Self::Conservative => FlowConfig::conservative(),
        }
    }
}

/// Pacing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowConfig {
    /// Largest chunk written in one message
    pub chunk_size: usize,
    /// Buffered bytes above which the sender backs off
    pub buffered_threshold: usize,
    /// Chunks written before yielding
    pub burst: usize,
    /// How often throughput is resampled
    pub sample_interval: Duration,
    /// Delay while the buffer is above threshold
    pub backoff: Duration,
}

impl FlowConfig {
    pub fn standard() -> Self {
        let chunk_size = 256 * KIB;
        Self {
            chunk_size,
            buffered_threshold: 4 * chunk_size,
            burst: 10,
            sample_interval: Duration::from_millis(500),
            backoff: BACKOFF_DELAY,
        }
    }

    pub fn conservative() -> Self {
        let chunk_size = 64 * KIB;
        Self {
            chunk_size,
            buffered_threshold: 2 * chunk_size,
            burst: 5,
            sample_interval: Duration::from_millis(300),
            backoff: BACKOFF_DELAY,
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// What the sender should do before its next write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Write one chunk now
    Send,
    /// Buffer is full; sleep and re-check
    Backoff(Duration),
    /// Burst complete; let other tasks run
    Yield,
}

/// Decides when the sender may write
#[derive(Debug)]
pub struct FlowController {
    config: FlowConfig,
    chunk_size: usize,
    sent_in_burst: usize,
    backed_off_in_burst: bool,
    consecutive_backoffs: u32,
    clean_bursts: u32,
}

impl FlowController {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config,
            chunk_size: config.chunk_size,
            sent_in_burst: 0,
            backed_off_in_burst: false,
            consecutive_backoffs: 0,
            clean_bursts: 0,
        }
    }

    /// Size the next chunk should have
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Decide the next step given the channel's current buffered amount
    ///
    /// Returns [`Pace::Send`] at most `burst` times in a row.
    pub fn next(&mut self, buffered: usize) -> Pace {
        if self.sent_in_burst >= self.config.burst {
            self.end_burst();
            return Pace::Yield;
        }
        if buffered > self.config.buffered_threshold {
            self.backed_off_in_burst = true;
            self.consecutive_backoffs += 1;
            if self.consecutive_backoffs >= SHRINK_AFTER_BACKOFFS {
                self.consecutive_backoffs = 0;
                self.shrink();
            }
            return Pace::Backoff(self.config.backoff);
        }
        self.consecutive_backoffs = 0;
        self.sent_in_burst += 1;
        Pace::Send
    }

    fn end_burst(&mut self) {
        self.sent_in_burst = 0;
        if self.backed_off_in_burst {
            self.clean_bursts = 0;
        } else {
            self.clean_bursts += 1;
            if self.clean_bursts >= GROW_AFTER_BURSTS {
                self.clean_bursts = 0;
                self.chunk_size = (self.chunk_size * 2).min(self.config.chunk_size);
            }
        }
        self.backed_off_in_burst = false;
    }

    fn shrink(&mut self) {
        let floor = MIN_CHUNK_SIZE.min(self.config.chunk_size);
        self.chunk_size = (self.chunk_size / 2).max(floor);
    }

    /// Wait until a write is allowed
    ///
    /// `buffered` is polled for the channel's current buffered amount.
    pub async fn ready(&mut self, buffered: impl Fn() -> usize) {
        loop {
            match self.next(buffered()) {
                Pace::Send => return,
                Pace::Backoff(delay) => tokio::time::sleep(delay).await,
                Pace::Yield => tokio::task::yield_now().await,
            }
        }
    }
}

/// Throughput estimate resampled at a fixed interval
#[derive(Debug)]
pub struct ThroughputMeter {
    interval: Duration,
    last_sample: Instant,
    bytes_since_sample: u64,
    bytes_per_second: f64,
}

impl ThroughputMeter {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_sample: now,
            bytes_since_sample: 0,
            bytes_per_second: 0.0,
        }
    }

    /// Account for `bytes` moved at `now`
    ///
    /// Returns the new rate when a sample interval has elapsed.
    pub fn record(&mut self, bytes: u64, now: Instant) -> Option<f64> {
        self.bytes_since_sample += bytes;
        let elapsed = now.saturating_duration_since(self.last_sample);
        if elapsed < self.interval || elapsed.is_zero() {
            return None;
        }
        self.bytes_per_second = self.bytes_since_sample as f64 / elapsed.as_secs_f64();
        self.bytes_since_sample = 0;
        self.last_sample = now;
        Some(self.bytes_per_second)
    }

    /// Most recent rate in bytes per second
    pub fn bytes_per_second(&self) -> f64 {
        self.bytes_per_second
    }
}

/// Percentage of `total` covered by `done`, 100 for an empty total
pub fn percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (done as f64 / total as f64 * 100.0).min(100.0)
}

/// Receiver progress before the blob is verified, capped at 99%
pub fn pending_percent(received: u64, total: u64) -> f64 {
    percent(received, total).min(MAX_PENDING_PERCENT)
}
