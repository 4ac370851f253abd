//! Time source for tick timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

use crate::stats::Timestamp;

/// Supplies the `now` handed to each tick.
pub trait Clock: Send + Sync {
    /// Unix seconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time that advances with the Tokio timer.
///
/// The Unix time is sampled once and then advanced with `tokio::time::Instant`,
/// so a paused test runtime moves it forward deterministically.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    anchor_unix: Timestamp,
    anchor: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        let anchor_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            anchor_unix,
            anchor: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        self.anchor_unix + self.anchor.elapsed().as_secs()
    }
}
