//! Battleground ranking.
//!
//! Contests are lined up by mean margin, from party B's strongest to party
//! A's strongest, and each occupies the span of cumulative units it adds.
//! The contests whose span lies closest to the majority threshold are the
//! ones a close race turns on.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::contest::ContestId;
use crate::distribution::MarginDistribution;

/// One ranked contest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattlegroundEntry {
    /// Contest identifier.
    pub id: ContestId,
    /// Mean margin.
    pub mean: f64,
    /// Units the contest awards.
    pub weight_units: u32,
    /// Cumulative units up to and including this contest, in mean order.
    pub cumulative_units: u64,
    /// Distance in units between the contest's span and the threshold.
    pub distance: f64,
}

/// Returns the `k` contests closest to the majority threshold, sorted by mean margin.
///
/// Contests without an entry in `weights` are ignored. Distance is zero when
/// the threshold falls inside a contest's span; ties go to the contest whose
/// span midpoint is nearer the threshold.
#[must_use]
pub fn rank_battlegrounds<D: MarginDistribution>(
    distributions: &BTreeMap<ContestId, D>,
    weights: &BTreeMap<ContestId, u32>,
    k: usize,
) -> Vec<BattlegroundEntry> {
    let mut lined_up: Vec<(&ContestId, f64, u32)> = distributions
        .iter()
        .filter_map(|(id, dist)| weights.get(id).map(|w| (id, dist.mean(), *w)))
        .collect();
    lined_up.sort_by(|a, b| a.1.total_cmp(&b.1));

    let total: u64 = lined_up.iter().map(|(_, _, w)| u64::from(*w)).sum();
    #[allow(clippy::cast_precision_loss)]
    let threshold = total as f64 / 2.0;

    let mut cumulative = 0u64;
    let mut ranked: Vec<(BattlegroundEntry, f64)> = lined_up
        .into_iter()
        .map(|(id, mean, weight_units)| {
            #[allow(clippy::cast_precision_loss)]
            let low = cumulative as f64;
            cumulative += u64::from(weight_units);
            #[allow(clippy::cast_precision_loss)]
            let high = cumulative as f64;

            let distance = if threshold < low {
                low - threshold
            } else if threshold > high {
                threshold - high
            } else {
                0.0
            };
            let midpoint_gap = (0.5 * (low + high) - threshold).abs();

            let entry = BattlegroundEntry {
                id: id.clone(),
                mean,
                weight_units,
                cumulative_units: cumulative,
                distance,
            };
            (entry, midpoint_gap)
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.0.distance
            .total_cmp(&b.0.distance)
            .then_with(|| a.1.total_cmp(&b.1))
    });
    ranked.truncate(k);

    let mut picked: Vec<BattlegroundEntry> = ranked.into_iter().map(|(entry, _)| entry).collect();
    picked.sort_by(|a, b| a.mean.total_cmp(&b.mean));
    picked
}
