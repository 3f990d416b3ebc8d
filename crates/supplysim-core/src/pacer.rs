//! Wall-clock pacing for the tick loop.
//!
//! Each working day records an anchor instant. Tick `k` of the day is due
//! at `anchor + k * interval`, so a late wake-up shortens the next wait
//! instead of pushing every later tick back.

use std::time::Duration;

use tokio::time::Instant;

/// Deadline calculator for one working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPacer {
    anchor: Instant,
    interval: Duration,
}

impl TickPacer {
    /// Anchor a new day at the current instant.
    pub fn start(interval: Duration) -> Self {
        Self::anchored_at(Instant::now(), interval)
    }

    /// Anchor a day at an explicit instant.
    pub const fn anchored_at(anchor: Instant, interval: Duration) -> Self {
        Self { anchor, interval }
    }

    /// The day's anchor.
    pub const fn anchor(&self) -> Instant {
        self.anchor
    }

    /// When tick `tick` of the day is due.
    ///
    /// Saturates at the anchor plus the largest representable offset.
    pub fn deadline(&self, tick: u32) -> Instant {
        let offset = self.interval.checked_mul(tick).unwrap_or(Duration::MAX);
        self.anchor
            .checked_add(offset)
            .unwrap_or_else(|| self.anchor.checked_add(self.interval).unwrap_or(self.anchor))
    }
}
