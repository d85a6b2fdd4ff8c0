//! Raw poll records and their normalization into typed polls.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::pollster::{Pollster, PollsterName};
use crate::contest::ContestId;
use crate::error::ValidationError;

/// Which race a poll asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRace {
    /// Presidential race.
    President,
    /// House of Representatives.
    House,
    /// Senate.
    Senate,
}

impl FromStr for TargetRace {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "president" => Ok(Self::President),
            "house" => Ok(Self::House),
            "senate" => Ok(Self::Senate),
            _ => Err(()),
        }
    }
}

/// Party shares reported by a poll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollResult {
    /// Party A share.
    pub party_a: f64,
    /// Party B share.
    pub party_b: f64,
}

impl PollResult {
    /// Party A share minus party B share.
    #[must_use]
    pub fn margin(&self) -> f64 {
        self.party_a - self.party_b
    }

    /// Checks that both shares are finite and within `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::OutOfRange` naming the first bad share.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [("party_a", self.party_a), ("party_b", self.party_b)] {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(ValidationError::out_of_range(
                    field,
                    value,
                    "share must be a finite value in [0, 1]",
                ));
            }
        }
        Ok(())
    }
}

/// A normalized poll. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    /// Who ran the poll.
    pub pollster: Pollster,
    /// When the poll was taken.
    pub date: DateTime<Utc>,
    /// Which race the poll asked about.
    pub target: TargetRace,
    /// The sub-contest, or `None` for a national poll.
    pub contest: Option<ContestId>,
    /// Reported shares.
    pub result: PollResult,
}

impl Poll {
    /// Returns true for national (generic ballot) polls.
    #[must_use]
    pub const fn is_national(&self) -> bool {
        self.contest.is_none()
    }

    /// Reported margin.
    #[must_use]
    pub fn margin(&self) -> f64 {
        self.result.margin()
    }
}

/// A poll record as handed over by the loading layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPoll {
    /// Pollster name.
    pub pollster: String,
    /// ISO 8601 date or timestamp.
    pub date: String,
    /// `president`, `house` or `senate`.
    pub target: String,
    /// Contest id, empty for national polls.
    #[serde(default)]
    pub contest: String,
    /// Party A share.
    pub party_a_share: f64,
    /// Party B share.
    pub party_b_share: f64,
}

/// Why a raw record was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Pollster not in the recognized set.
    UnknownPollster,
    /// Date could not be parsed.
    InvalidDate,
    /// Target race kind not recognized.
    UnknownTarget,
    /// Contest id not part of the race.
    UnknownContest,
    /// Shares missing, negative, or above 1.
    InvalidShares,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnknownPollster => "unknown pollster",
            Self::InvalidDate => "invalid date",
            Self::UnknownTarget => "unknown target",
            Self::UnknownContest => "unknown contest",
            Self::InvalidShares => "invalid shares",
        };
        f.write_str(text)
    }
}

/// Counts of accepted and dropped records from one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    /// Records turned into polls.
    pub accepted: usize,
    /// Dropped records per reason.
    pub dropped: BTreeMap<DropReason, usize>,
}

impl IngestReport {
    /// Total dropped records.
    #[must_use]
    pub fn total_dropped(&self) -> usize {
        self.dropped.values().sum()
    }

    /// Dropped records for one reason.
    #[must_use]
    pub fn dropped_for(&self, reason: DropReason) -> usize {
        self.dropped.get(&reason).copied().unwrap_or(0)
    }

    fn drop_record(&mut self, reason: DropReason) {
        *self.dropped.entry(reason).or_default() += 1;
    }
}

/// Parses a JSON array of raw poll records.
///
/// # Errors
///
/// Returns `ValidationError::MalformedInput` if the text is not a JSON array
/// of records.
pub fn parse_raw_polls(json: &str) -> Result<Vec<RawPoll>, ValidationError> {
    serde_json::from_str(json).map_err(|e| ValidationError::MalformedInput {
        reason: format!("failed to parse poll records: {e}"),
    })
}

/// Parses an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
#[must_use]
pub fn parse_poll_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Turns raw records into typed polls.
///
/// Records from unrecognized pollsters, with unparsable dates, unknown target
/// kinds, contest ids outside `known_contests`, or shares outside `[0, 1]` are
/// dropped. Drops never fail the batch; they are counted in the report.
pub fn normalize_polls(
    raw: &[RawPoll],
    known_contests: &BTreeSet<ContestId>,
) -> (Vec<Poll>, IngestReport) {
    let mut report = IngestReport::default();
    let mut polls = Vec::with_capacity(raw.len());

    for (index, record) in raw.iter().enumerate() {
        match normalize_one(record, known_contests) {
            Ok(poll) => polls.push(poll),
            Err(reason) => {
                debug!(index, pollster = %record.pollster, %reason, "dropping poll record");
                report.drop_record(reason);
            }
        }
    }

    report.accepted = polls.len();
    info!(
        accepted = report.accepted,
        dropped = report.total_dropped(),
        "normalized poll batch"
    );
    (polls, report)
}

fn normalize_one(record: &RawPoll, known_contests: &BTreeSet<ContestId>) -> Result<Poll, DropReason> {
    let name: PollsterName = record
        .pollster
        .parse()
        .map_err(|_| DropReason::UnknownPollster)?;
    let date = parse_poll_date(&record.date).ok_or(DropReason::InvalidDate)?;
    let target: TargetRace = record.target.parse().map_err(|()| DropReason::UnknownTarget)?;

    let contest = match record.contest.trim() {
        "" => None,
        id => {
            let id = ContestId::new(id);
            if !known_contests.contains(&id) {
                return Err(DropReason::UnknownContest);
            }
            Some(id)
        }
    };

    let result = PollResult {
        party_a: record.party_a_share,
        party_b: record.party_b_share,
    };
    result.validate().map_err(|_| DropReason::InvalidShares)?;

    Ok(Poll {
        pollster: Pollster::new(name),
        date,
        target,
        contest,
        result,
    })
}
