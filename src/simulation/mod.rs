//! Monte Carlo simulation of the whole race.
//!
//! Each iteration draws one shared national margin, then for every contest a
//! structural deviation and (depending on polling) an own-polling draw, and
//! blends them with the same elasticity [`Race::compute`] uses. Outcomes are
//! tallied into win shares, a unit-total distribution and tipping-contest
//! shares.
//!
//! Iterations are independent. Iteration `i` seeds its own `SmallRng` with
//! `base + i`, where `base` is drawn once from the caller's generator, so a
//! run gives the same result serially or across rayon workers.

pub mod config;
pub mod tally;

pub use config::SimulationConfig;
pub use tally::{tipping_contest, winner, Tally, Winner};

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::battleground::{rank_battlegrounds, BattlegroundEntry};
use crate::contest::ContestId;
use crate::distribution::{standard_normal, Discretized, MarginDistribution, Normal};
use crate::error::{ForecastResult, ModelError};
use crate::race::{Race, RaceComputeConfig, RaceOutput};

/// Iterations run between deadline checks.
const CHUNK_SIZE: usize = 1024;

/// Upper bound on sample storage reserved up front.
const MAX_RESERVED_SAMPLES: usize = 1 << 16;

/// Share of iterations won by each side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WinProbabilities {
    /// Party A majority.
    pub party_a: f64,
    /// Party B majority.
    pub party_b: f64,
    /// Exact split.
    pub tie: f64,
}

/// Share of iterations in which each contest tipped the winner over the line.
///
/// Contests that never tipped are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TippingShares {
    /// Tipping contests of party A wins.
    pub party_a: BTreeMap<ContestId, f64>,
    /// Tipping contests of party B wins.
    pub party_b: BTreeMap<ContestId, f64>,
}

/// Result of [`Race::simulate`]. Derived on every call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationOutput {
    /// Win, loss and tie shares.
    pub win_probabilities: WinProbabilities,
    /// Simulated national margins.
    pub national: Discretized,
    /// Simulated margins per contest.
    pub contests: BTreeMap<ContestId, Discretized>,
    /// Entry `u` is the share of iterations in which party A won exactly `u` units.
    pub weighted_unit_distribution: Vec<f64>,
    /// Tipping-contest attribution.
    pub tipping_shares: TippingShares,
    /// Iterations actually run.
    pub iterations_completed: usize,
    /// True if the run stopped early on its deadline.
    pub truncated: bool,
}

impl SimulationOutput {
    /// Expected number of units won by party A.
    #[must_use]
    pub fn expected_units_a(&self) -> f64 {
        self.weighted_unit_distribution
            .iter()
            .enumerate()
            .map(|(units, share)| {
                #[allow(clippy::cast_precision_loss)]
                let units = units as f64;
                units * share
            })
            .sum()
    }

    /// Simulated margins for one contest.
    #[must_use]
    pub fn contest(&self, id: &ContestId) -> Option<&Discretized> {
        self.contests.get(id)
    }
}

/// Closed-form and simulated outputs of one forecast run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    /// Output of [`Race::compute`].
    pub race: RaceOutput,
    /// Output of [`Race::simulate`].
    pub simulation: SimulationOutput,
}

struct ContestModel {
    uniqueness: Normal,
    own: Option<Normal>,
}

/// Everything one iteration needs, resolved before sampling starts.
struct SamplingModel {
    national: Normal,
    contests: Vec<ContestModel>,
    elasticity: f64,
    floor: Normal,
}

impl SamplingModel {
    fn draw(&self, seed: u64) -> (f64, Vec<f64>) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let national = self.national.mean() + standard_normal(&mut rng) * self.national.std();

        let margins = self
            .contests
            .iter()
            .map(|contest| {
                let from_national = national + contest.uniqueness.sample(&mut rng);
                let own = match &contest.own {
                    Some(own) => own.sample(&mut rng),
                    None => from_national + self.floor.sample(&mut rng),
                };
                own * self.elasticity + from_national * (1.0 - self.elasticity)
            })
            .collect();

        (national, margins)
    }
}

impl Race {
    fn sampling_model(
        &self,
        precomputed: &RaceOutput,
        compute_config: &RaceComputeConfig,
    ) -> ForecastResult<SamplingModel> {
        let contests = self
            .contests()
            .iter()
            .map(|(id, presidential)| {
                let output = precomputed
                    .contest(id)
                    .ok_or_else(|| ModelError::MissingContest {
                        contest: id.to_string(),
                    })?;
                Ok(ContestModel {
                    uniqueness: *presidential.contest.uniqueness(),
                    own: output.own,
                })
            })
            .collect::<ForecastResult<Vec<_>>>()?;

        Ok(SamplingModel {
            national: precomputed.national,
            contests,
            elasticity: compute_config.contest_elasticity,
            floor: compute_config.no_polling_floor()?,
        })
    }

    /// Simulates the race `config.iterations` times.
    ///
    /// `precomputed` must come from [`Race::compute`] with the same
    /// `compute_config`; only its national distribution and each contest's
    /// own-polling distribution are sampled. `rng` supplies the base seed.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for an invalid simulation or compute config
    /// - `ModelError::MissingContest` if `precomputed` lacks a contest of this race
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        config: &SimulationConfig,
        precomputed: &RaceOutput,
        compute_config: &RaceComputeConfig,
        rng: &mut R,
    ) -> ForecastResult<SimulationOutput> {
        config.validate()?;
        compute_config.validate()?;

        let model = self.sampling_model(precomputed, compute_config)?;
        let base_seed: u64 = rng.random();
        let started = Instant::now();
        let deadline = config.max_duration().map(|budget| started + budget);

        let weights: Vec<u32> = self.contests().values().map(|c| c.weight_units).collect();
        let mut tally = Tally::new(weights, config.iterations.min(MAX_RESERVED_SAMPLES));
        let mut truncated = false;
        let mut next = 0;

        while next < config.iterations {
            if next > 0 && deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(
                    completed = next,
                    requested = config.iterations,
                    "simulation deadline reached, stopping early"
                );
                truncated = true;
                break;
            }

            let end = (next + CHUNK_SIZE).min(config.iterations);
            let seed = |i: usize| base_seed.wrapping_add(i as u64);
            let draws: Vec<(f64, Vec<f64>)> = if config.parallel {
                (next..end).into_par_iter().map(|i| model.draw(seed(i))).collect()
            } else {
                (next..end).map(|i| model.draw(seed(i))).collect()
            };
            for (national, margins) in &draws {
                tally.record(*national, margins);
            }
            next = end;
        }

        let output = self.summarize(&tally, config.discretization_points, truncated)?;
        info!(
            iterations = output.iterations_completed,
            truncated,
            elapsed_ms = started.elapsed().as_millis(),
            party_a = output.win_probabilities.party_a,
            party_b = output.win_probabilities.party_b,
            tie = output.win_probabilities.tie,
            "simulation finished"
        );
        Ok(output)
    }

    fn summarize(&self, tally: &Tally, points: usize, truncated: bool) -> ForecastResult<SimulationOutput> {
        let ids: Vec<&ContestId> = self.contests().keys().collect();

        let contests = ids
            .iter()
            .zip(&tally.contest_samples)
            .map(|(id, samples)| Ok(((*id).clone(), Discretized::from_samples(samples, points)?)))
            .collect::<ForecastResult<BTreeMap<_, _>>>()?;

        let shares = |counts: &[u64]| -> BTreeMap<ContestId, f64> {
            ids.iter()
                .zip(counts)
                .filter(|(_, count)| **count > 0)
                .map(|(id, count)| ((*id).clone(), tally.share(*count)))
                .collect()
        };

        Ok(SimulationOutput {
            win_probabilities: WinProbabilities {
                party_a: tally.share(tally.wins_a),
                party_b: tally.share(tally.wins_b),
                tie: tally.share(tally.ties),
            },
            national: Discretized::from_samples(&tally.national_samples, points)?,
            contests,
            weighted_unit_distribution: tally.unit_counts.iter().map(|c| tally.share(*c)).collect(),
            tipping_shares: TippingShares {
                party_a: shares(&tally.tipping_a),
                party_b: shares(&tally.tipping_b),
            },
            iterations_completed: tally.iterations,
            truncated,
        })
    }

    /// Computes the race as of `as_of`, then simulates it.
    ///
    /// # Errors
    ///
    /// Any error of [`Race::compute`] or [`Race::simulate`].
    pub fn forecast<R: Rng + ?Sized>(
        &self,
        compute_config: &RaceComputeConfig,
        simulation_config: &SimulationConfig,
        as_of: DateTime<Utc>,
        rng: &mut R,
    ) -> ForecastResult<Forecast> {
        let race = self.compute(compute_config, as_of)?;
        let simulation = self.simulate(simulation_config, &race, compute_config, rng)?;
        Ok(Forecast { race, simulation })
    }

    /// The `k` simulated contests closest to the majority threshold.
    #[must_use]
    pub fn battlegrounds(&self, output: &SimulationOutput, k: usize) -> Vec<BattlegroundEntry> {
        rank_battlegrounds(&output.contests, &self.weights(), k)
    }
}
