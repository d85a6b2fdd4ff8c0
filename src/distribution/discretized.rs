//! Empirical distributions on a fixed-resolution CDF grid.
//!
//! The CDF is tabulated at `N` equally spaced points from `start` to `end`
//! with `cdf[0] == 0` and `cdf[N - 1] == 1`. Values between grid points are
//! linearly interpolated, both for `probability_below` and for the inverse
//! (`value_at_percentile`).

use rand::Rng;
use serde::Serialize;

use super::normal::Normal;
use super::MarginDistribution;
use crate::error::ValidationError;

/// Minimum grid resolution.
pub const MIN_POINTS: usize = 2;

/// A `(x, y)` pair for charting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Margin.
    pub x: f64,
    /// Probability mass or cumulative probability at `x`.
    pub y: f64,
}

/// How [`Discretized::combine`] merges its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineMode {
    /// Pointwise weighted blend of the input CDFs.
    #[default]
    Blend,

    /// Blend outside the two peaks, straight line between them.
    ///
    /// Only defined for exactly two inputs whose means are also their modes.
    Flathead,
}

/// Empirical distribution on a CDF grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discretized {
    cdf: Vec<f64>,
    start: f64,
    end: f64,
    mean: f64,
}

impl Discretized {
    /// Builds a distribution from raw samples, binned on `points` grid points
    /// spanning the sample range.
    ///
    /// `cdf[i]` is the fraction of samples strictly below grid point `i`.
    /// When every sample has the same value the result is a point mass.
    ///
    /// # Errors
    ///
    /// - `ValidationError::TooFewPoints` if `points < 2`
    /// - `ValidationError::EmptySamples` for an empty slice
    /// - `ValidationError::NonFiniteSample` if a sample is NaN or infinite
    pub fn from_samples(samples: &[f64], points: usize) -> Result<Self, ValidationError> {
        check_points(points)?;
        if samples.is_empty() {
            return Err(ValidationError::EmptySamples);
        }
        if let Some(index) = samples.iter().position(|v| !v.is_finite()) {
            return Err(ValidationError::NonFiniteSample { index });
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let start = sorted[0];
        let end = sorted[sorted.len() - 1];
        if end <= start {
            return Ok(Self::point_mass(start, points));
        }

        #[allow(clippy::cast_precision_loss)]
        let total = sorted.len() as f64;
        let dx = grid_step(start, end, points);

        let cdf = (0..points)
            .map(|i| {
                if i == points - 1 {
                    return 1.0;
                }
                #[allow(clippy::cast_precision_loss)]
                let x = start + dx * i as f64;
                let below = sorted.partition_point(|&v| v < x);
                #[allow(clippy::cast_precision_loss)]
                let fraction = below as f64 / total;
                fraction
            })
            .collect();

        Ok(Self::from_parts(cdf, start, end))
    }

    /// Tabulates a normal over `mean ± 3 std`.
    ///
    /// The truncated CDF is renormalized so the end points are exactly 0 and 1.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::TooFewPoints` if `points < 2`.
    pub fn from_normal(normal: &Normal, points: usize) -> Result<Self, ValidationError> {
        check_points(points)?;
        if normal.is_point_mass() {
            return Ok(Self::point_mass(normal.mean(), points));
        }

        let (start, end) = normal.support();
        let dx = grid_step(start, end, points);
        let base = normal.probability_below(start);
        let span = normal.probability_below(end) - base;

        let cdf = (0..points)
            .map(|i| {
                if i == 0 {
                    return 0.0;
                }
                if i == points - 1 {
                    return 1.0;
                }
                #[allow(clippy::cast_precision_loss)]
                let x = start + dx * i as f64;
                ((normal.probability_below(x) - base) / span).clamp(0.0, 1.0)
            })
            .collect();

        Ok(Self::from_parts(cdf, start, end))
    }

    /// Combines distributions on a common grid spanning the union of their ranges.
    ///
    /// Weights are normalized to sum to 1. See [`CombineMode`] for the modes.
    ///
    /// # Errors
    ///
    /// - `ValidationError::FlatheadArity` for `Flathead` with other than two inputs
    /// - `ValidationError::MalformedInput` for no inputs
    /// - `ValidationError::WeightCountMismatch` if lengths differ
    /// - `ValidationError::InvalidWeights` for negative, non-finite or all-zero weights
    /// - `ValidationError::TooFewPoints` if `points < 2`
    pub fn combine(
        inputs: &[Self],
        weights: &[f64],
        mode: CombineMode,
        points: usize,
    ) -> Result<Self, ValidationError> {
        if mode == CombineMode::Flathead && inputs.len() != 2 {
            return Err(ValidationError::FlatheadArity {
                actual: inputs.len(),
            });
        }
        if inputs.is_empty() {
            return Err(ValidationError::MalformedInput {
                reason: "no distributions to combine".to_string(),
            });
        }
        if weights.len() != inputs.len() {
            return Err(ValidationError::WeightCountMismatch {
                inputs: inputs.len(),
                weights: weights.len(),
            });
        }
        check_points(points)?;

        let weight_sum: f64 = weights.iter().sum();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weight_sum <= 0.0 {
            return Err(ValidationError::InvalidWeights);
        }
        let weights: Vec<f64> = weights.iter().map(|w| w / weight_sum).collect();

        let start = inputs.iter().map(Self::start).fold(f64::INFINITY, f64::min);
        let end = inputs.iter().map(Self::end).fold(f64::NEG_INFINITY, f64::max);
        if end <= start {
            return Ok(Self::point_mass(start, points));
        }

        let blended = |x: f64| -> f64 {
            inputs
                .iter()
                .zip(&weights)
                .map(|(d, w)| w * d.probability_below(x))
                .sum::<f64>()
        };

        let flat = match mode {
            CombineMode::Blend => None,
            CombineMode::Flathead => {
                let (lo, hi) = if inputs[0].mean <= inputs[1].mean {
                    (inputs[0].mean, inputs[1].mean)
                } else {
                    (inputs[1].mean, inputs[0].mean)
                };
                (hi > lo).then(|| (lo, hi, blended(lo), blended(hi)))
            }
        };

        let dx = grid_step(start, end, points);
        let cdf = (0..points)
            .map(|i| {
                if i == 0 {
                    return 0.0;
                }
                if i == points - 1 {
                    return 1.0;
                }
                #[allow(clippy::cast_precision_loss)]
                let x = start + dx * i as f64;
                let value = match flat {
                    Some((lo, hi, at_lo, at_hi)) if x > lo && x < hi => {
                        at_lo + (at_hi - at_lo) * (x - lo) / (hi - lo)
                    }
                    _ => blended(x),
                };
                value.clamp(0.0, 1.0)
            })
            .collect();

        Ok(Self::from_parts(cdf, start, end))
    }

    fn point_mass(value: f64, points: usize) -> Self {
        let mut cdf = vec![0.0; points];
        cdf[points - 1] = 1.0;
        Self {
            cdf,
            start: value,
            end: value,
            mean: value,
        }
    }

    fn from_parts(cdf: Vec<f64>, start: f64, end: f64) -> Self {
        let dx = grid_step(start, end, cdf.len());
        let mean = cdf
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                #[allow(clippy::cast_precision_loss)]
                let midpoint = start + dx * (i as f64 + 0.5);
                (pair[1] - pair[0]) * midpoint
            })
            .sum();
        Self {
            cdf,
            start,
            end,
            mean,
        }
    }

    /// Lowest value with non-zero probability.
    #[must_use]
    pub const fn start(&self) -> f64 {
        self.start
    }

    /// Highest value with non-zero probability.
    #[must_use]
    pub const fn end(&self) -> f64 {
        self.end
    }

    /// Mean of the tabulated distribution.
    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// Number of grid points.
    #[must_use]
    pub fn points(&self) -> usize {
        self.cdf.len()
    }

    /// Raw CDF values, one per grid point.
    #[must_use]
    pub fn cdf(&self) -> &[f64] {
        &self.cdf
    }

    /// Returns true if all mass sits on a single value.
    #[must_use]
    pub fn is_point_mass(&self) -> bool {
        self.end <= self.start
    }

    fn dx(&self) -> f64 {
        grid_step(self.start, self.end, self.cdf.len())
    }

    #[allow(clippy::cast_precision_loss)]
    fn x_at(&self, index: usize) -> f64 {
        self.start + self.dx() * index as f64
    }

    /// Inverse CDF with linear interpolation between grid points.
    ///
    /// `0` maps to `start` and `1` maps to `end`.
    #[must_use]
    pub fn value_at_percentile(&self, probability: f64) -> f64 {
        if self.is_point_mass() || probability.is_nan() || probability <= 0.0 {
            return self.start;
        }
        if probability >= 1.0 {
            return self.end;
        }

        // cdf[0] == 0 <= p and cdf[last] == 1 > p, so 1 <= above <= last
        let above = self.cdf.partition_point(|&c| c <= probability);
        let below = above - 1;
        let fraction = (probability - self.cdf[below]) / (self.cdf[above] - self.cdf[below]);

        #[allow(clippy::cast_precision_loss)]
        let value = self.start + self.dx() * (below as f64 + fraction);
        value
    }

    /// Probability mass of each grid cell, paired with the cell's upper edge.
    #[must_use]
    pub fn pdf_as_points(&self) -> Vec<ChartPoint> {
        self.cdf
            .windows(2)
            .enumerate()
            .map(|(i, pair)| ChartPoint {
                x: self.x_at(i + 1),
                y: pair[1] - pair[0],
            })
            .collect()
    }

    /// CDF values paired with their grid coordinate.
    #[must_use]
    pub fn cdf_as_points(&self) -> Vec<ChartPoint> {
        self.cdf
            .iter()
            .enumerate()
            .map(|(i, &y)| ChartPoint { x: self.x_at(i), y })
            .collect()
    }
}

impl MarginDistribution for Discretized {
    fn mean(&self) -> f64 {
        self.mean
    }

    fn probability_below(&self, x: f64) -> f64 {
        if x.is_nan() {
            return 0.0;
        }
        if self.is_point_mass() {
            return if x < self.start { 0.0 } else { 1.0 };
        }
        if x <= self.start {
            return 0.0;
        }
        if x >= self.end {
            return 1.0;
        }

        let last = self.cdf.len() - 1;
        let position = (x - self.start) / self.dx();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let below = (position.floor() as usize).min(last - 1);
        #[allow(clippy::cast_precision_loss)]
        let fraction = position - below as f64;

        self.cdf[below] + (self.cdf[below + 1] - self.cdf[below]) * fraction
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.value_at_percentile(rng.random::<f64>())
    }
}

fn check_points(points: usize) -> Result<(), ValidationError> {
    if points < MIN_POINTS {
        return Err(ValidationError::TooFewPoints {
            min: MIN_POINTS,
            actual: points,
        });
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn grid_step(start: f64, end: f64, points: usize) -> f64 {
    (end - start) / (points - 1) as f64
}
