// Application configuration types
//
// Cadence bookkeeping for the two independent tick sources (poll, render)
// plus the tuning constants around them.

use std::time::{Duration, Instant};

// ============================================================================
// Constants
// ============================================================================

/// Minimum poll interval in milliseconds.
pub const MIN_POLL_MS: u64 = 250;

/// Maximum poll interval in milliseconds.
pub const MAX_POLL_MS: u64 = 10_000;

/// Poll interval adjustment step in milliseconds.
pub const POLL_STEP_MS: u64 = 250;

/// Default endpoint TTL as a multiple of the poll interval. An endpoint
/// that drops off the connection table disappears from the map shortly
/// after, not instantly and not forever.
pub const TTL_POLL_MULTIPLIER: u32 = 3;

/// Weight at which a map marker grows a halo circle.
pub const HEAVY_WEIGHT_THRESHOLD: usize = 3;

/// Lower bound on the main-loop event wait, so key handling stays snappy
/// even with long cadences.
pub const MIN_EVENT_WAIT: Duration = Duration::from_millis(10);

/// Upper bound on the main-loop event wait.
pub const MAX_EVENT_WAIT: Duration = Duration::from_millis(250);

// ============================================================================
// Cadence
// ============================================================================

/// A fixed-interval tick source. Poll and render each own one; they never
/// share timers.
#[derive(Debug, Clone)]
pub struct Cadence {
    interval: Duration,
    last_fired: Option<Instant>,
}

impl Cadence {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Due on the first call, then once per elapsed interval.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_fired {
            None => true,
            Some(t) => now.duration_since(t) >= self.interval,
        }
    }

    pub fn fire(&mut self, now: Instant) {
        self.last_fired = Some(now);
    }

    /// Time until the next due tick. Zero when already due.
    pub fn until_due(&self, now: Instant) -> Duration {
        match self.last_fired {
            None => Duration::ZERO,
            Some(t) => self.interval.saturating_sub(now.duration_since(t)),
        }
    }

    /// Whole intervals missed beyond the one about to fire. Nonzero means
    /// the consumer fell behind and frames were skipped, never queued.
    pub fn lag_periods(&self, now: Instant) -> u64 {
        let Some(t) = self.last_fired else {
            return 0;
        };
        if self.interval.is_zero() {
            return 0;
        }
        let periods = now.duration_since(t).as_nanos() / self.interval.as_nanos();
        (periods as u64).saturating_sub(1)
    }
}
