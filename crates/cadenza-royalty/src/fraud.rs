//! Fraud stream analysis.
//!
//! Fraud scores are supplied by an external analyzer as floats in [0, 1];
//! this module only counts. A stream is qualified when its duration meets
//! the minimum threshold, and fraudulent when it is qualified and its
//! score exceeds the cutoff, so `fraud_streams <= qualified_streams`
//! always holds.

use serde::{Deserialize, Serialize};

use cadenza_types::events::StreamEvent;
use cadenza_types::{FRAUD_SCORE_CUTOFF, MIN_QUALIFIED_DURATION_SECS};

/// Thresholds for stream qualification and fraud counting.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FraudConfig {
    /// Minimum play duration for a stream to qualify.
    pub min_duration_secs: u32,
    /// Fraud score above which a qualified stream counts as fraudulent.
    pub score_cutoff: f64,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: MIN_QUALIFIED_DURATION_SECS,
            score_cutoff: FRAUD_SCORE_CUTOFF,
        }
    }
}

/// Counts produced from one creator's events for a period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStats {
    pub qualified_streams: u64,
    pub fraud_streams: u64,
}

impl StreamStats {
    /// Proportion of qualified streams flagged as fraudulent.
    ///
    /// Zero when there are no qualified streams.
    pub fn fraud_ratio(&self) -> f64 {
        if self.qualified_streams == 0 {
            0.0
        } else {
            self.fraud_streams as f64 / self.qualified_streams as f64
        }
    }
}

/// Count qualified and fraudulent streams in a batch of events.
///
/// Pure function of its inputs; events for other creators should be
/// filtered out by the caller.
pub fn analyze(events: &[StreamEvent], config: &FraudConfig) -> StreamStats {
    let mut stats = StreamStats::default();
    for event in events {
        if !event.is_qualified(config.min_duration_secs) {
            continue;
        }
        stats.qualified_streams += 1;
        if event.fraud_score > config.score_cutoff {
            stats.fraud_streams += 1;
        }
    }
    stats
}
