//! Polling-coverage quality score.
//!
//! The score ramps linearly with the number of polls and saturates at 1.0 once
//! the count reaches the configured baseline: `min(count / baseline, 1.0)`.
//! A contest with thin coverage gets its fitted uncertainty widened by
//! `(1 - quality)` times the configured factor.

use serde::{Deserialize, Serialize};

use super::poll::Poll;
use crate::error::ValidationError;

/// Parameters for [`polling_quality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingQualityConfig {
    /// Poll count at which coverage counts as complete.
    pub baseline_count: usize,
}

impl Default for PollingQualityConfig {
    fn default() -> Self {
        Self { baseline_count: 10 }
    }
}

impl PollingQualityConfig {
    /// Validate the config.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.baseline_count == 0 {
            return Err(ValidationError::out_of_range(
                "baseline_count",
                0.0,
                "must be > 0",
            ));
        }
        Ok(())
    }
}

/// Quality score in `[0, 1]` for a set of polls.
#[must_use]
pub fn polling_quality(polls: &[&Poll], config: &PollingQualityConfig) -> f64 {
    quality_for_count(polls.len(), config.baseline_count)
}

/// Quality score for a poll count against a baseline.
///
/// A zero baseline means no polls are needed, so the score is saturated.
#[must_use]
pub fn quality_for_count(count: usize, baseline: usize) -> f64 {
    if baseline == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = count as f64 / baseline as f64;
    ratio.min(1.0)
}
