//! Contests and per-contest poll aggregation.
//!
//! A [`Contest`] carries a fixed structural lean (`uniqueness`) and a growing
//! list of polls. [`Contest::compute`] aggregates the polls inside the window
//! into a margin distribution, or `Ok(None)` when there is nothing to go on.
//! A poll with corrupt shares is an error, not missing data.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::distribution::{Normal, Paired};
use crate::error::ValidationError;
use crate::polling::{polling_quality, Poll, PollingQualityConfig};

/// Identifier of a sub-contest (a state, a district).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContestId(String);

impl ContestId {
    /// Creates an id from its name.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContestId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ContestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Parameters for aggregating a contest's polls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContestComputeConfig {
    /// Polls older than this many days are ignored.
    pub poll_window_days: u32,
    /// Coverage quality parameters.
    pub quality: PollingQualityConfig,
    /// Std added at zero coverage quality, scaled by `1 - quality`.
    pub quality_uncertainty_factor: f64,
}

impl Default for ContestComputeConfig {
    fn default() -> Self {
        Self {
            poll_window_days: 30,
            quality: PollingQualityConfig::default(),
            quality_uncertainty_factor: 0.02,
        }
    }
}

impl ContestComputeConfig {
    /// Validate the config.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.quality.validate()?;
        let factor = self.quality_uncertainty_factor;
        if !factor.is_finite() || factor < 0.0 {
            return Err(ValidationError::out_of_range(
                "quality_uncertainty_factor",
                factor,
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// A contest: structural lean plus its polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contest {
    uniqueness: Normal,
    polls: Vec<Poll>,
}

impl Contest {
    /// Creates a contest with no polls.
    #[must_use]
    pub const fn new(uniqueness: Normal) -> Self {
        Self {
            uniqueness,
            polls: Vec::new(),
        }
    }

    /// The national ballot: no structural lean.
    #[must_use]
    pub const fn national() -> Self {
        Self::new(Normal::zero())
    }

    /// Deviation from the national environment, fixed at construction.
    #[must_use]
    pub const fn uniqueness(&self) -> &Normal {
        &self.uniqueness
    }

    /// Every poll attached so far.
    #[must_use]
    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    /// Appends polls. Nothing is deduplicated.
    pub fn add_polls(&mut self, polls: impl IntoIterator<Item = Poll>) {
        self.polls.extend(polls);
    }

    /// Polls dated within `poll_window_days` before `as_of`.
    ///
    /// Polls dated after `as_of` are excluded.
    pub fn polls_in_window<'a>(
        &'a self,
        config: &ContestComputeConfig,
        as_of: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a Poll> + 'a {
        let window = Duration::days(i64::from(config.poll_window_days));
        self.polls.iter().filter(move |poll| {
            let age = as_of - poll.date;
            age >= Duration::zero() && age <= window
        })
    }

    /// Aggregates the polls in the window into a margin distribution.
    ///
    /// Fits a normal to the poll margins, then widens its std by
    /// `(1 - quality) * quality_uncertainty_factor`. Returns `Ok(None)` when no
    /// poll falls inside the window.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::OutOfRange` if a poll in the window carries a
    /// non-finite or out-of-range share.
    pub fn compute(
        &self,
        config: &ContestComputeConfig,
        as_of: DateTime<Utc>,
    ) -> Result<Option<Normal>, ValidationError> {
        let Some(valid) = self.checked_window(config, as_of)? else {
            return Ok(None);
        };
        let margins: Vec<f64> = valid.iter().map(|poll| poll.margin()).collect();
        let fitted = Normal::from_samples(&margins)?;
        Ok(Some(fitted.widened(coverage_penalty(&valid, config))))
    }

    /// Aggregates each party's share separately.
    ///
    /// Used for popular-vote displays, not for the win simulation. Returns
    /// `Ok(None)` when no poll falls inside the window.
    ///
    /// # Errors
    ///
    /// Same as [`Contest::compute`].
    pub fn compute_separate(
        &self,
        config: &ContestComputeConfig,
        as_of: DateTime<Utc>,
    ) -> Result<Option<Paired>, ValidationError> {
        let Some(valid) = self.checked_window(config, as_of)? else {
            return Ok(None);
        };
        let party_a: Vec<f64> = valid.iter().map(|poll| poll.result.party_a).collect();
        let party_b: Vec<f64> = valid.iter().map(|poll| poll.result.party_b).collect();

        let penalty = coverage_penalty(&valid, config);
        let a = Normal::from_samples(&party_a)?.widened(penalty);
        let b = Normal::from_samples(&party_b)?.widened(penalty);
        Ok(Some(Paired::new(a, b)))
    }

    fn checked_window(
        &self,
        config: &ContestComputeConfig,
        as_of: DateTime<Utc>,
    ) -> Result<Option<Vec<&Poll>>, ValidationError> {
        let valid: Vec<&Poll> = self.polls_in_window(config, as_of).collect();
        if valid.is_empty() {
            return Ok(None);
        }
        for poll in &valid {
            poll.result.validate()?;
        }
        Ok(Some(valid))
    }
}

fn coverage_penalty(valid: &[&Poll], config: &ContestComputeConfig) -> f64 {
    let quality = polling_quality(valid, &config.quality);
    (1.0 - quality) * config.quality_uncertainty_factor
}

/// A sub-contest that allocates weighted units (electoral votes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresidentialContest {
    /// Contest identifier.
    pub id: ContestId,
    /// Units awarded to the winner of this contest.
    pub weight_units: u32,
    /// Lean and polls.
    pub contest: Contest,
}

impl PresidentialContest {
    /// Creates a contest with no polls.
    #[must_use]
    pub fn new(id: impl Into<ContestId>, weight_units: u32, uniqueness: Normal) -> Self {
        Self {
            id: id.into(),
            weight_units,
            contest: Contest::new(uniqueness),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::MarginDistribution;
    use crate::polling::{PollResult, Pollster, PollsterName, TargetRace};
    use chrono::TimeZone;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap()
    }

    fn poll(days_ago: i64, a: f64, b: f64) -> Poll {
        Poll {
            pollster: Pollster::new(PollsterName::FoxNews),
            date: as_of() - Duration::days(days_ago),
            target: TargetRace::President,
            contest: None,
            result: PollResult {
                party_a: a,
                party_b: b,
            },
        }
    }

    #[test]
    fn test_compute_without_polls_is_none() {
        let contest = Contest::national();
        assert!(contest
            .compute(&ContestComputeConfig::default(), as_of())
            .unwrap()
            .is_none());
        assert!(contest
            .compute_separate(&ContestComputeConfig::default(), as_of())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_compute_ignores_polls_outside_window() {
        let mut contest = Contest::national();
        contest.add_polls([poll(45, 0.5, 0.4), poll(-2, 0.5, 0.4)]);
        assert!(contest
            .compute(&ContestComputeConfig::default(), as_of())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_compute_single_poll() {
        let mut contest = Contest::national();
        contest.add_polls([poll(3, 0.49, 0.46)]);
        let config = ContestComputeConfig::default();

        let dist = contest.compute(&config, as_of()).unwrap().unwrap();
        assert!((dist.mean() - 0.03).abs() < 1e-12);
        // One poll against a baseline of ten: quality 0.1.
        assert!((dist.std() - 0.9 * 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_compute_full_coverage_has_no_penalty() {
        let mut contest = Contest::national();
        contest.add_polls((0..10).map(|i| poll(i, 0.50, if i % 2 == 0 { 0.46 } else { 0.48 })));
        let config = ContestComputeConfig::default();

        let dist = contest.compute(&config, as_of()).unwrap().unwrap();
        assert!((dist.mean() - 0.03).abs() < 1e-12);
        assert!((dist.std() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_compute_separate_fits_each_party() {
        let mut contest = Contest::national();
        contest.add_polls([poll(1, 0.48, 0.44), poll(2, 0.50, 0.46)]);
        let config = ContestComputeConfig {
            quality_uncertainty_factor: 0.0,
            ..ContestComputeConfig::default()
        };

        let pair = contest.compute_separate(&config, as_of()).unwrap().unwrap();
        let split = pair.vote_split();
        assert!((split.party_a - 0.49).abs() < 1e-12);
        assert!((split.party_b - 0.45).abs() < 1e-12);
        assert!((pair.mean() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_compute_rejects_corrupt_share_in_window() {
        let mut contest = Contest::national();
        contest.add_polls([poll(1, 0.50, 0.45), poll(2, 0.50, 0.45), poll(3, f64::NAN, 0.45)]);
        let config = ContestComputeConfig::default();

        let err = contest.compute(&config, as_of()).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "party_a"));
        assert!(contest.compute_separate(&config, as_of()).is_err());

        // outside the window it is never read
        let mut stale = Contest::national();
        stale.add_polls([poll(1, 0.50, 0.45), poll(60, 1.5, 0.45)]);
        assert!(stale.compute(&config, as_of()).unwrap().is_some());
    }

    #[test]
    fn test_polls_are_appended_not_deduplicated() {
        let mut contest = Contest::national();
        let p = poll(1, 0.5, 0.4);
        contest.add_polls([p.clone(), p]);
        assert_eq!(contest.polls().len(), 2);
    }

    #[test]
    fn test_config_validation() {
        assert!(ContestComputeConfig::default().validate().is_ok());
        let bad = ContestComputeConfig {
            quality_uncertainty_factor: -0.1,
            ..ContestComputeConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: ContestComputeConfig = serde_json::from_str(r#"{"poll_window_days": 14}"#).unwrap();
        assert_eq!(config.poll_window_days, 14);
        assert_eq!(config.quality.baseline_count, 10);
    }
}
