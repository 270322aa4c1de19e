//! Revenue periods.
//!
//! Distribution runs on fixed 30-day revenue periods indexed from the Unix
//! epoch, the same scheme the platform's billing service uses. A period is
//! identified by its `[start, end)` bounds in Unix seconds; idempotency
//! keys for period-scoped credits embed both bounds.

use serde::{Deserialize, Serialize};

/// Revenue period duration in seconds (30 days).
pub const PERIOD_DURATION_SECS: u64 = 30 * 24 * 3600;

/// A half-open revenue period `[start, end)` in Unix seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    /// Inclusive start, Unix seconds.
    pub start: u64,
    /// Exclusive end, Unix seconds.
    pub end: u64,
}

impl Period {
    /// Construct a period, validating that `start < end`.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// The standard period containing the given timestamp.
    pub fn containing(timestamp: u64) -> Self {
        let start = (timestamp / PERIOD_DURATION_SECS) * PERIOD_DURATION_SECS;
        Self {
            start,
            end: start + PERIOD_DURATION_SECS,
        }
    }

    /// The fully elapsed period immediately before the one containing
    /// `timestamp`. This is what the monthly distribution job settles.
    pub fn previous(timestamp: u64) -> Self {
        let current = Self::containing(timestamp);
        Self {
            start: current.start.saturating_sub(PERIOD_DURATION_SECS),
            end: current.start,
        }
    }

    /// Whether the timestamp falls inside this period.
    pub fn contains(&self, timestamp: u64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Sequential index of this period since the Unix epoch.
    pub fn index(&self) -> u64 {
        self.start / PERIOD_DURATION_SECS
    }
}
