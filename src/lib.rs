//! # ballotcast - election forecasting for weighted multi-contest races
//!
//! ballotcast turns historical baseline results and incoming opinion polls
//! into margin distributions for a national "generic ballot" and for every
//! sub-contest, then simulates the race to produce win probabilities, a
//! distribution over units won and tipping-contest attribution.
//!
//! ## Core Concepts
//!
//! - **Margin**: party A share minus party B share; positive favors party A
//! - **Distribution**: a margin distribution (`Normal`, `Discretized`, `Paired`)
//! - **Contest**: a structural lean (`uniqueness`) plus the polls seen so far
//! - **Race**: the national ballot and all weighted sub-contests
//! - **Elasticity**: how far a contest's own polling overrides the national inference
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ballotcast::{Race, RaceComputeConfig, RaceLoadConfig, SimulationConfig};
//! use rand::{rngs::SmallRng, SeedableRng};
//!
//! let mut race = Race::load(&history, &RaceLoadConfig::default())?;
//! let report = race.ingest(&raw_polls);
//!
//! let compute = RaceComputeConfig::default();
//! let mut rng = SmallRng::seed_from_u64(2024);
//! let forecast = race.forecast(&compute, &SimulationConfig::default(), as_of, &mut rng)?;
//! println!("A wins {:.1}%", forecast.simulation.win_probabilities.party_a * 100.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Leaf types
pub mod distribution;
pub mod error;
pub mod polling;

// Model
pub mod battleground;
pub mod contest;
pub mod race;
pub mod simulation;

// Re-export primary types at crate root for convenience
pub use battleground::{rank_battlegrounds, BattlegroundEntry};
pub use contest::{Contest, ContestComputeConfig, ContestId, PresidentialContest};
pub use distribution::{
    ChartPoint, CombineMode, Discretized, Distribution, MarginDistribution, Normal, Paired,
    VoteSplit,
};
pub use error::{ForecastError, ForecastResult, ModelError, ValidationError};
pub use polling::{
    normalize_polls, parse_raw_polls, polling_quality, DropReason, IngestReport, Poll,
    PollResult, Pollster, PollsterName, PollingQualityConfig, RawPoll, TargetRace,
};
pub use race::{
    ContestOutput, HistoricalResult, Race, RaceComputeConfig, RaceLoadConfig, RaceOutput,
};
pub use simulation::{
    Forecast, SimulationConfig, SimulationOutput, TippingShares, WinProbabilities,
};
