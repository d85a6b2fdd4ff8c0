//! Outcome bookkeeping for simulated elections.
//!
//! Contests are addressed by their position in the race's id order; the
//! simulator maps positions back to ids when it builds the output.

/// Who carried a simulated election.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    /// Party A holds a strict majority of units.
    PartyA,
    /// Party B holds a strict majority of units.
    PartyB,
    /// Exactly half of the units each.
    Tie,
}

/// Classifies a unit count against the majority threshold.
#[must_use]
pub fn winner(units_a: u64, total: u64) -> Winner {
    match (units_a * 2).cmp(&total) {
        std::cmp::Ordering::Greater => Winner::PartyA,
        std::cmp::Ordering::Less => Winner::PartyB,
        std::cmp::Ordering::Equal => Winner::Tie,
    }
}

/// The contest that pushed the winner past the majority threshold.
///
/// Contests are ordered by margin toward the loser (ascending for a party A
/// win, descending for party B) and their units accumulated in that order;
/// the first contest at which the running total exceeds half of `total` is
/// the tipping contest. Returns `None` for a tie.
#[must_use]
pub fn tipping_contest(margins: &[f64], weights: &[u32], winner: Winner) -> Option<usize> {
    let mut order: Vec<usize> = (0..margins.len()).collect();
    match winner {
        Winner::PartyA => order.sort_by(|&a, &b| margins[a].total_cmp(&margins[b])),
        Winner::PartyB => order.sort_by(|&a, &b| margins[b].total_cmp(&margins[a])),
        Winner::Tie => return None,
    }

    let total: u64 = weights.iter().copied().map(u64::from).sum();
    let mut cumulative = 0u64;
    order.into_iter().find(|&index| {
        cumulative += u64::from(weights[index]);
        cumulative * 2 > total
    })
}

/// Running totals over a batch of iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    weights: Vec<u32>,
    total_units: u64,
    /// Completed iterations.
    pub iterations: usize,
    /// Party A wins.
    pub wins_a: u64,
    /// Party B wins.
    pub wins_b: u64,
    /// Exact ties.
    pub ties: u64,
    /// Iteration count per party A unit total, indexed by units.
    pub unit_counts: Vec<u64>,
    /// Per contest: iterations in which it tipped a party A win.
    pub tipping_a: Vec<u64>,
    /// Per contest: iterations in which it tipped a party B win.
    pub tipping_b: Vec<u64>,
    /// National margin sample per iteration.
    pub national_samples: Vec<f64>,
    /// Per contest margin samples, one per iteration.
    pub contest_samples: Vec<Vec<f64>>,
}

impl Tally {
    /// Empty tally for contests with the given unit weights.
    #[must_use]
    pub fn new(weights: Vec<u32>, capacity: usize) -> Self {
        let total_units: u64 = weights.iter().copied().map(u64::from).sum();
        let contests = weights.len();
        let slots = usize::try_from(total_units).map_or(0, |t| t + 1);
        Self {
            weights,
            total_units,
            iterations: 0,
            wins_a: 0,
            wins_b: 0,
            ties: 0,
            unit_counts: vec![0; slots],
            tipping_a: vec![0; contests],
            tipping_b: vec![0; contests],
            national_samples: Vec::with_capacity(capacity),
            contest_samples: (0..contests).map(|_| Vec::with_capacity(capacity)).collect(),
        }
    }

    /// Total units in play.
    #[must_use]
    pub const fn total_units(&self) -> u64 {
        self.total_units
    }

    /// Records one simulated election.
    ///
    /// A contest counts for party A only with a strictly positive margin.
    pub fn record(&mut self, national: f64, margins: &[f64]) {
        debug_assert_eq!(margins.len(), self.weights.len());

        let units_a: u64 = margins
            .iter()
            .zip(&self.weights)
            .filter(|(margin, _)| **margin > 0.0)
            .map(|(_, w)| u64::from(*w))
            .sum();

        let outcome = winner(units_a, self.total_units);
        match outcome {
            Winner::PartyA => self.wins_a += 1,
            Winner::PartyB => self.wins_b += 1,
            Winner::Tie => self.ties += 1,
        }
        if let Some(slot) = usize::try_from(units_a)
            .ok()
            .and_then(|u| self.unit_counts.get_mut(u))
        {
            *slot += 1;
        }

        if let Some(index) = tipping_contest(margins, &self.weights, outcome) {
            match outcome {
                Winner::PartyA => self.tipping_a[index] += 1,
                Winner::PartyB => self.tipping_b[index] += 1,
                Winner::Tie => {}
            }
        }

        self.national_samples.push(national);
        for (samples, margin) in self.contest_samples.iter_mut().zip(margins) {
            samples.push(*margin);
        }
        self.iterations += 1;
    }

    /// `count / iterations`, or 0 before any iteration.
    #[must_use]
    pub fn share(&self, count: u64) -> f64 {
        if self.iterations == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let share = count as f64 / self.iterations as f64;
        share
    }
}
