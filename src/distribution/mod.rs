//! Probability distributions over a vote margin.
//!
//! A margin is the signed difference between party A's and party B's shares;
//! positive values favor party A. Every distribution exposes the same
//! capability contract through [`MarginDistribution`]:
//! - `mean()`
//! - `probability_below(x)`, non-decreasing in `x`
//! - `sample(rng)`, the only operation that consumes randomness
//!
//! [`Distribution`] is the closed set of variants the engine works with.

pub mod discretized;
pub mod normal;
pub mod paired;

pub use discretized::{ChartPoint, CombineMode, Discretized};
pub use normal::{standard_normal, Normal};
pub use paired::{Paired, VoteSplit};

use rand::Rng;
use serde::Serialize;

/// Grid resolution used when a closed-form distribution has to be tabulated.
pub const DEFAULT_GRID_POINTS: usize = 200;

/// Capability contract shared by all margin distributions.
pub trait MarginDistribution {
    /// Expected margin.
    fn mean(&self) -> f64;

    /// Probability that the margin falls below `x`, always within `[0, 1]`.
    ///
    /// A NaN `x` is below nothing and yields `0.0`.
    fn probability_below(&self, x: f64) -> f64;

    /// Draws one margin from the distribution.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64;

    /// Probability that party A wins the contest (margin strictly above zero).
    fn probability_above_zero(&self) -> f64 {
        1.0 - self.probability_below(0.0)
    }
}

/// A margin distribution of any supported shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution {
    /// Closed-form normal.
    Normal(Normal),
    /// Empirical CDF on a fixed grid.
    Discretized(Discretized),
    /// Two separate party-share distributions.
    Paired(Paired),
}

impl Distribution {
    /// Returns the inner normal, if this is one.
    #[must_use]
    pub const fn as_normal(&self) -> Option<&Normal> {
        match self {
            Self::Normal(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the inner discretized distribution, if this is one.
    #[must_use]
    pub const fn as_discretized(&self) -> Option<&Discretized> {
        match self {
            Self::Discretized(d) => Some(d),
            _ => None,
        }
    }

    /// Interval that holds practically all of the probability mass.
    ///
    /// Normals are cut at three standard deviations, matching
    /// [`Discretized::from_normal`].
    #[must_use]
    pub fn support(&self) -> (f64, f64) {
        match self {
            Self::Normal(n) => n.support(),
            Self::Discretized(d) => (d.start(), d.end()),
            Self::Paired(p) => p.support(),
        }
    }

    /// Tabulates the distribution on a grid of `points` points.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::TooFewPoints` if `points < 2`.
    pub fn to_discretized(&self, points: usize) -> Result<Discretized, crate::error::ValidationError> {
        match self {
            Self::Normal(n) => Discretized::from_normal(n, points),
            Self::Discretized(d) => Ok(d.clone()),
            Self::Paired(p) => p.to_discretized(points),
        }
    }
}

impl MarginDistribution for Distribution {
    fn mean(&self) -> f64 {
        match self {
            Self::Normal(n) => n.mean(),
            Self::Discretized(d) => d.mean(),
            Self::Paired(p) => p.mean(),
        }
    }

    fn probability_below(&self, x: f64) -> f64 {
        match self {
            Self::Normal(n) => n.probability_below(x),
            Self::Discretized(d) => d.probability_below(x),
            Self::Paired(p) => p.probability_below(x),
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Normal(n) => n.sample(rng),
            Self::Discretized(d) => d.sample(rng),
            Self::Paired(p) => p.sample(rng),
        }
    }
}

impl From<Normal> for Distribution {
    fn from(value: Normal) -> Self {
        Self::Normal(value)
    }
}

impl From<Discretized> for Distribution {
    fn from(value: Discretized) -> Self {
        Self::Discretized(value)
    }
}

impl From<Paired> for Distribution {
    fn from(value: Paired) -> Self {
        Self::Paired(value)
    }
}
