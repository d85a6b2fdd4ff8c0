//! Separate party-share distributions.

use rand::Rng;
use serde::Serialize;

use super::{Discretized, Distribution, MarginDistribution, Normal, DEFAULT_GRID_POINTS};
use crate::error::ValidationError;

/// Popular-vote split derived from two party-share means.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoteSplit {
    /// Expected share for party A.
    pub party_a: f64,
    /// Share not assigned to either party.
    pub undecided: f64,
    /// Expected share for party B.
    pub party_b: f64,
}

/// Party A and party B shares modeled separately.
///
/// The pair is treated as a margin `party_a - party_b`. `covariance` is kept
/// for correlated two-party modeling but does not enter any computation yet:
/// the two sides are combined as independent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paired {
    /// Party A share distribution.
    pub party_a: Box<Distribution>,
    /// Party B share distribution.
    pub party_b: Box<Distribution>,
    /// How tied the two sides are (0 = independent).
    pub covariance: f64,
}

impl Paired {
    /// Creates an independent pair.
    #[must_use]
    pub fn new(party_a: impl Into<Distribution>, party_b: impl Into<Distribution>) -> Self {
        Self {
            party_a: Box::new(party_a.into()),
            party_b: Box::new(party_b.into()),
            covariance: 0.0,
        }
    }

    /// Sets the covariance parameter.
    #[must_use]
    pub fn with_covariance(mut self, covariance: f64) -> Self {
        self.covariance = covariance;
        self
    }

    /// Closed-form margin when both sides are normal.
    #[must_use]
    pub fn margin_normal(&self) -> Option<Normal> {
        let a = self.party_a.as_normal()?;
        let b = self.party_b.as_normal()?;
        Some(a.shifted_by_weighted(b, [1.0, -1.0]))
    }

    /// Expected shares of each side and the remainder.
    #[must_use]
    pub fn vote_split(&self) -> VoteSplit {
        let party_a = self.party_a.mean();
        let party_b = self.party_b.mean();
        VoteSplit {
            party_a,
            undecided: 1.0 - party_a - party_b,
            party_b,
        }
    }

    /// Interval holding practically all of the margin's mass.
    #[must_use]
    pub fn support(&self) -> (f64, f64) {
        let (a_lo, a_hi) = self.party_a.support();
        let (b_lo, b_hi) = self.party_b.support();
        (a_lo - b_hi, a_hi - b_lo)
    }

    /// Tabulates the margin on a grid of `points` points over [`Paired::support`].
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::TooFewPoints` if `points < 2`.
    pub fn to_discretized(&self, points: usize) -> Result<Discretized, ValidationError> {
        if let Some(normal) = self.margin_normal() {
            return Discretized::from_normal(&normal, points);
        }
        let (start, end) = self.support();
        if points < 2 || end <= start {
            // Delegate edge cases (too few points, point mass) to the sample path.
            return Discretized::from_samples(&[self.mean()], points);
        }
        let samples = tabulated_quantiles(self, start, end, points);
        Discretized::from_samples(&samples, points)
    }
}

/// Margin values at evenly spaced probability levels, used to rebuild a grid.
fn tabulated_quantiles(pair: &Paired, start: f64, end: f64, points: usize) -> Vec<f64> {
    #[allow(clippy::cast_precision_loss)]
    let dx = (end - start) / (points - 1) as f64;
    #[allow(clippy::cast_precision_loss)]
    let cdf: Vec<f64> = (0..points)
        .map(|i| pair.probability_below(start + dx * i as f64))
        .collect();

    // Invert the tabulated CDF at fine probability steps.
    let resolution = points * 20;
    (0..resolution)
        .map(|k| {
            #[allow(clippy::cast_precision_loss)]
            let p = (k as f64 + 0.5) / resolution as f64;
            let above = cdf.partition_point(|&c| c <= p).clamp(1, points - 1);
            let below = above - 1;
            let gap = cdf[above] - cdf[below];
            let fraction = if gap > 0.0 { (p - cdf[below]) / gap } else { 0.0 };
            #[allow(clippy::cast_precision_loss)]
            let x = start + dx * (below as f64 + fraction.clamp(0.0, 1.0));
            x
        })
        .collect()
}

impl MarginDistribution for Paired {
    fn mean(&self) -> f64 {
        self.party_a.mean() - self.party_b.mean()
    }

    fn probability_below(&self, x: f64) -> f64 {
        if let Some(normal) = self.margin_normal() {
            return normal.probability_below(x);
        }

        // P(A - B < x) = sum over B cells of P(B in cell) * P(A < x + b)
        let Ok(b) = self.party_b.to_discretized(DEFAULT_GRID_POINTS) else {
            return self.party_a.probability_below(x + self.party_b.mean());
        };
        if b.is_point_mass() {
            return self.party_a.probability_below(x + b.start());
        }

        let cells = b.cdf_as_points();
        cells
            .windows(2)
            .map(|pair| {
                let mass = pair[1].y - pair[0].y;
                let midpoint = 0.5 * (pair[0].x + pair[1].x);
                mass * self.party_a.probability_below(x + midpoint)
            })
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.party_a.sample(rng) - self.party_b.sample(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn normal(mean: f64, std: f64) -> Normal {
        Normal::new(mean, std).unwrap()
    }

    #[test]
    fn test_mean_is_margin() {
        let pair = Paired::new(normal(0.48, 0.01), normal(0.46, 0.01));
        assert!((pair.mean() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_vote_split() {
        let pair = Paired::new(normal(0.48, 0.01), normal(0.46, 0.01));
        let split = pair.vote_split();
        assert!((split.party_a - 0.48).abs() < 1e-12);
        assert!((split.party_b - 0.46).abs() < 1e-12);
        assert!((split.undecided - 0.06).abs() < 1e-12);
    }

    #[test]
    fn test_normal_pair_has_closed_form() {
        let pair = Paired::new(normal(0.5, 0.03), normal(0.5, 0.04));
        let margin = pair.margin_normal().unwrap();
        assert!(margin.mean().abs() < 1e-12);
        assert!((margin.std() - 0.05).abs() < 1e-12);
        assert!((pair.probability_below(0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_mixed_pair_matches_normal_reference() {
        let b = normal(0.45, 0.02);
        let b_grid = Discretized::from_normal(&b, 400).unwrap();
        let mixed = Paired::new(normal(0.47, 0.02), b_grid);
        let reference = Paired::new(normal(0.47, 0.02), b);

        for x in [-0.04, 0.0, 0.02, 0.05] {
            let diff = (mixed.probability_below(x) - reference.probability_below(x)).abs();
            assert!(diff < 0.02, "x={x} diff={diff}");
        }
    }

    #[test]
    fn test_covariance_is_carried_but_unused() {
        let pair = Paired::new(normal(0.5, 0.02), normal(0.4, 0.02)).with_covariance(0.7);
        let plain = Paired::new(normal(0.5, 0.02), normal(0.4, 0.02));
        assert_eq!(pair.covariance, 0.7);
        assert_eq!(pair.probability_below(0.1), plain.probability_below(0.1));
    }

    #[test]
    fn test_sample_is_difference() {
        let pair = Paired::new(normal(0.6, 0.0), normal(0.35, 0.0));
        let mut rng = SmallRng::seed_from_u64(3);
        assert!((pair.sample(&mut rng) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_to_discretized_mixed() {
        let b_grid = Discretized::from_normal(&normal(0.45, 0.02), 200).unwrap();
        let pair = Paired::new(normal(0.47, 0.02), b_grid);
        let grid = pair.to_discretized(100).unwrap();
        assert!((grid.mean() - 0.02).abs() < 5e-3);
    }
}
