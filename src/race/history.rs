//! Historical baseline results and the partisanship they imply.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::contest::ContestId;
use crate::error::{ModelError, ValidationError};

/// Vote totals for one contest from a previous election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalResult {
    /// Votes for party A.
    pub party_a_total: u64,
    /// Votes for party B.
    pub party_b_total: u64,
    /// All votes cast, including other candidates.
    pub grand_total: u64,
    /// Units this contest awards.
    pub weight_units: u32,
    /// Sub-contest of a state that splits its allocation (a congressional
    /// district). Excluded when deriving the national environment.
    #[serde(default)]
    pub split_allocation: bool,
}

impl HistoricalResult {
    /// Signed margin `(a - b) / total`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidHistory` when the grand total is zero or
    /// smaller than the two party totals combined.
    pub fn margin(&self, contest: &ContestId) -> Result<f64, ModelError> {
        self.check(contest)?;
        #[allow(clippy::cast_precision_loss)]
        let margin = (self.party_a_total as f64 - self.party_b_total as f64) / self.grand_total as f64;
        Ok(margin)
    }

    fn check(&self, contest: &ContestId) -> Result<(), ModelError> {
        if self.grand_total == 0 {
            return Err(ModelError::InvalidHistory {
                contest: contest.to_string(),
                reason: "grand total is zero".to_string(),
            });
        }
        let parties = self.party_a_total.checked_add(self.party_b_total);
        if parties.map_or(true, |sum| sum > self.grand_total) {
            return Err(ModelError::InvalidHistory {
                contest: contest.to_string(),
                reason: "party totals exceed the grand total".to_string(),
            });
        }
        Ok(())
    }
}

/// Parameters for [`crate::Race::load`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceLoadConfig {
    /// Std of every contest's uniqueness (residual historical noise).
    pub uniqueness_std: f64,
}

impl Default for RaceLoadConfig {
    fn default() -> Self {
        Self {
            uniqueness_std: 0.01,
        }
    }
}

impl RaceLoadConfig {
    /// Validate the config.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.uniqueness_std.is_finite() || self.uniqueness_std < 0.0 {
            return Err(ValidationError::out_of_range(
                "uniqueness_std",
                self.uniqueness_std,
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// National environment over the base contests: `(sum a - sum b) / sum total`.
///
/// Split-allocation sub-contests are skipped so their votes are not counted
/// twice alongside the state they belong to.
///
/// # Errors
///
/// - `ModelError::EmptyHistory` for an empty batch
/// - `ModelError::InvalidHistory` for a contest with unusable totals
/// - `ModelError::ZeroEnvironmentTotal` if the base contests hold no votes
pub fn national_environment(history: &BTreeMap<ContestId, HistoricalResult>) -> Result<f64, ModelError> {
    if history.is_empty() {
        return Err(ModelError::EmptyHistory);
    }

    let mut party_a = 0u128;
    let mut party_b = 0u128;
    let mut total = 0u128;
    for (id, result) in history {
        result.check(id)?;
        if result.split_allocation {
            continue;
        }
        party_a += u128::from(result.party_a_total);
        party_b += u128::from(result.party_b_total);
        total += u128::from(result.grand_total);
    }

    if total == 0 {
        return Err(ModelError::ZeroEnvironmentTotal);
    }

    #[allow(clippy::cast_precision_loss)]
    let environment = (party_a as f64 - party_b as f64) / total as f64;
    Ok(environment)
}
