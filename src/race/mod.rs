//! The race model.
//!
//! A [`Race`] holds the national ballot plus every sub-contest. Loading fixes
//! each contest's structural lean relative to one national environment;
//! [`Race::compute`] then blends the national polling signal with each
//! contest's own polling into a "whole" margin distribution.
//!
//! The blend is controlled by `contest_elasticity` (`e`):
//!
//! ```text
//! environment_i = national + uniqueness_i
//! whole_i       = (1 - e) * environment_i + e * own_i          (own polling)
//! whole_i       = environment_i + e * N(0, no_polling_std)     (no polling)
//! ```
//!
//! The simulator samples exactly this model, so its per-contest results agree
//! with `compute` in distribution.

pub mod history;

pub use history::{national_environment, HistoricalResult, RaceLoadConfig};

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::contest::{Contest, ContestComputeConfig, ContestId, PresidentialContest};
use crate::distribution::{MarginDistribution, Normal, VoteSplit};
use crate::error::{ForecastResult, ModelError, ValidationError};
use crate::polling::{normalize_polls, IngestReport, Poll, RawPoll};

/// Parameters for [`Race::compute`] and the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceComputeConfig {
    /// Weight of a contest's own polling against the national inference, in `[0, 1]`.
    pub contest_elasticity: f64,
    /// Std of the stand-in for a contest without polling.
    pub no_polling_uncertainty_std: f64,
    /// Aggregation of national polls.
    pub national: ContestComputeConfig,
    /// Aggregation of per-contest polls.
    pub contest: ContestComputeConfig,
}

impl Default for RaceComputeConfig {
    fn default() -> Self {
        Self {
            contest_elasticity: 0.4,
            no_polling_uncertainty_std: 0.015,
            national: ContestComputeConfig::default(),
            contest: ContestComputeConfig::default(),
        }
    }
}

impl RaceComputeConfig {
    /// Validate the config.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let e = self.contest_elasticity;
        if !e.is_finite() || !(0.0..=1.0).contains(&e) {
            return Err(ValidationError::out_of_range(
                "contest_elasticity",
                e,
                "must be in [0, 1]",
            ));
        }
        let std = self.no_polling_uncertainty_std;
        if !std.is_finite() || std < 0.0 {
            return Err(ValidationError::out_of_range(
                "no_polling_uncertainty_std",
                std,
                "must be finite and non-negative",
            ));
        }
        self.national.validate()?;
        self.contest.validate()
    }

    /// The distribution standing in for missing contest polling.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::OutOfRange` for an invalid std.
    pub fn no_polling_floor(&self) -> Result<Normal, ValidationError> {
        Normal::new(0.0, self.no_polling_uncertainty_std)
    }
}

/// Closed-form distributions for one contest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContestOutput {
    /// Combined margin distribution.
    pub whole: Normal,
    /// Aggregate of the contest's own polls, `None` without polling.
    pub own: Option<Normal>,
}

impl ContestOutput {
    /// Probability that party A carries the contest.
    #[must_use]
    pub fn probability_a_wins(&self) -> f64 {
        self.whole.probability_above_zero()
    }
}

/// Result of [`Race::compute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceOutput {
    /// National ballot distribution.
    pub national: Normal,
    /// Per-contest distributions.
    pub contests: BTreeMap<ContestId, ContestOutput>,
}

impl RaceOutput {
    /// Output for one contest.
    #[must_use]
    pub fn contest(&self, id: &ContestId) -> Option<&ContestOutput> {
        self.contests.get(id)
    }

    /// Whole distributions keyed by contest, for ranking.
    #[must_use]
    pub fn whole_distributions(&self) -> BTreeMap<ContestId, Normal> {
        self.contests
            .iter()
            .map(|(id, out)| (id.clone(), out.whole))
            .collect()
    }
}

/// National ballot plus every weighted sub-contest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    national: Contest,
    contests: BTreeMap<ContestId, PresidentialContest>,
    environment: f64,
}

impl Race {
    /// Loads every contest from one batch of historical results.
    ///
    /// The national environment is derived from the base contests first;
    /// every contest, split-allocation ones included, then gets a uniqueness
    /// of `N(margin - environment, uniqueness_std)`.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for an invalid config
    /// - `ModelError::EmptyHistory`, `ModelError::ZeroEnvironmentTotal` or
    ///   `ModelError::InvalidHistory` for an unusable batch
    pub fn load(
        history: &BTreeMap<ContestId, HistoricalResult>,
        config: &RaceLoadConfig,
    ) -> ForecastResult<Self> {
        config.validate()?;
        let environment = national_environment(history)?;

        let mut contests = BTreeMap::new();
        for (id, result) in history {
            let partisanship = result.margin(id)? - environment;
            let uniqueness = Normal::new(partisanship, config.uniqueness_std)?;
            contests.insert(
                id.clone(),
                PresidentialContest::new(id.clone(), result.weight_units, uniqueness),
            );
        }

        info!(
            contests = contests.len(),
            environment,
            "loaded race from historical results"
        );

        Ok(Self {
            national: Contest::national(),
            contests,
            environment,
        })
    }

    /// Builds a race from already-configured contests, with a zero environment.
    ///
    /// Test and benchmark fixture only: the uniqueness values are taken as
    /// given instead of being derived in one batch against a shared
    /// environment. Use [`Race::load`] for real historical data.
    #[doc(hidden)]
    #[must_use]
    pub fn from_contests(contests: impl IntoIterator<Item = PresidentialContest>) -> Self {
        Self {
            national: Contest::national(),
            contests: contests
                .into_iter()
                .map(|contest| (contest.id.clone(), contest))
                .collect(),
            environment: 0.0,
        }
    }

    /// Historical national margin the uniqueness values are relative to.
    #[must_use]
    pub const fn environment(&self) -> f64 {
        self.environment
    }

    /// The national ballot.
    #[must_use]
    pub const fn national(&self) -> &Contest {
        &self.national
    }

    /// Every sub-contest, ordered by id.
    #[must_use]
    pub const fn contests(&self) -> &BTreeMap<ContestId, PresidentialContest> {
        &self.contests
    }

    /// One sub-contest.
    #[must_use]
    pub fn contest(&self, id: &ContestId) -> Option<&PresidentialContest> {
        self.contests.get(id)
    }

    /// Ids of every sub-contest.
    #[must_use]
    pub fn contest_ids(&self) -> BTreeSet<ContestId> {
        self.contests.keys().cloned().collect()
    }

    /// Total units across all contests.
    #[must_use]
    pub fn weight_units(&self) -> u32 {
        self.contests.values().map(|c| c.weight_units).sum()
    }

    /// Units per contest.
    #[must_use]
    pub fn weights(&self) -> BTreeMap<ContestId, u32> {
        self.contests
            .iter()
            .map(|(id, c)| (id.clone(), c.weight_units))
            .collect()
    }

    /// Routes polls: national polls to the national ballot, the rest by contest id.
    ///
    /// Returns how many polls named a contest outside this race; those are dropped.
    pub fn add_polls(&mut self, polls: impl IntoIterator<Item = Poll>) -> usize {
        let mut unrouted = 0;
        for poll in polls {
            match &poll.contest {
                None => self.national.add_polls([poll]),
                Some(id) => match self.contests.get_mut(id) {
                    Some(target) => target.contest.add_polls([poll]),
                    None => {
                        debug!(contest = %id, "dropping poll for contest outside the race");
                        unrouted += 1;
                    }
                },
            }
        }
        unrouted
    }

    /// Normalizes raw records against this race's contests and routes the result.
    pub fn ingest(&mut self, raw: &[RawPoll]) -> IngestReport {
        let (polls, report) = normalize_polls(raw, &self.contest_ids());
        self.add_polls(polls);
        report
    }

    /// Closed-form national and per-contest margin distributions as of `as_of`.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for an invalid config, or for a poll in the window
    ///   with a non-finite or out-of-range share
    /// - `ModelError::NoNationalPolling` if no national poll falls in the window
    pub fn compute(&self, config: &RaceComputeConfig, as_of: DateTime<Utc>) -> ForecastResult<RaceOutput> {
        config.validate()?;

        let national = self.national.compute(&config.national, as_of)?.ok_or(
            ModelError::NoNationalPolling {
                window_days: config.national.poll_window_days,
            },
        )?;
        let floor = config.no_polling_floor()?;
        let e = config.contest_elasticity;

        let mut contests = BTreeMap::new();
        let mut unpolled = 0usize;
        for (id, presidential) in &self.contests {
            let environment = national.shifted_by(presidential.contest.uniqueness());
            let own = presidential.contest.compute(&config.contest, as_of)?;
            let whole = match &own {
                Some(own) => environment.shifted_by_weighted(own, [1.0 - e, e]),
                None => {
                    debug!(contest = %id, "no polling in window, using uncertainty floor");
                    unpolled += 1;
                    environment.shifted_by_weighted(&floor, [1.0, e])
                }
            };
            contests.insert(id.clone(), ContestOutput { whole, own });
        }

        info!(
            national = %national,
            contests = contests.len(),
            unpolled,
            "computed race distributions"
        );

        Ok(RaceOutput { national, contests })
    }

    /// Popular-vote split from the national polls, `Ok(None)` without polling.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if a national poll in the window has a
    /// corrupt share.
    pub fn popular_vote(
        &self,
        config: &ContestComputeConfig,
        as_of: DateTime<Utc>,
    ) -> Result<Option<VoteSplit>, ValidationError> {
        Ok(self
            .national
            .compute_separate(config, as_of)?
            .map(|pair| pair.vote_split()))
    }
}
