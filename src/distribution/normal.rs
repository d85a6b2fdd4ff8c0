//! Closed-form normal distribution.

use std::f64::consts::{PI, SQRT_2};
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::function::erf::erf;

use super::MarginDistribution;
use crate::error::ValidationError;

/// Width of the support interval, in standard deviations.
pub(crate) const SUPPORT_SIGMAS: f64 = 3.0;

/// A normal distribution `(mean, std)`.
///
/// A zero standard deviation is allowed and describes a point mass.
///
/// # Examples
///
/// ```
/// use ballotcast::{MarginDistribution, Normal};
///
/// let national = Normal::new(0.02, 0.01).unwrap();
/// let lean = Normal::new(0.05, 0.0).unwrap();
/// let environment = national.shifted_by(&lean);
/// assert!((environment.mean() - 0.07).abs() < 1e-12);
/// assert!((national.probability_below(0.02) - 0.5).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normal {
    mean: f64,
    std: f64,
}

impl Normal {
    /// Creates a normal distribution with validation.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::OutOfRange` if the mean is not finite or the
    /// standard deviation is negative or not finite.
    pub fn new(mean: f64, std: f64) -> Result<Self, ValidationError> {
        if !mean.is_finite() {
            return Err(ValidationError::out_of_range("mean", mean, "must be finite"));
        }
        if !std.is_finite() || std < 0.0 {
            return Err(ValidationError::out_of_range(
                "std",
                std,
                "must be finite and non-negative",
            ));
        }
        Ok(Self { mean, std })
    }

    /// The standard normal `N(0, 1)`.
    #[must_use]
    pub const fn standard() -> Self {
        Self { mean: 0.0, std: 1.0 }
    }

    /// Point mass at zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self { mean: 0.0, std: 0.0 }
    }

    /// Fits a normal to the population mean and standard deviation of `samples`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptySamples` for an empty slice and
    /// `ValidationError::NonFiniteSample` if any value is NaN or infinite.
    pub fn from_samples(samples: &[f64]) -> Result<Self, ValidationError> {
        if samples.is_empty() {
            return Err(ValidationError::EmptySamples);
        }
        if let Some(index) = samples.iter().position(|v| !v.is_finite()) {
            return Err(ValidationError::NonFiniteSample { index });
        }

        #[allow(clippy::cast_precision_loss)]
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Ok(Self {
            mean,
            std: variance.sqrt(),
        })
    }

    /// Mean of the distribution.
    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// Standard deviation of the distribution.
    #[must_use]
    pub const fn std(&self) -> f64 {
        self.std
    }

    /// Returns true if all mass sits on the mean.
    #[must_use]
    pub fn is_point_mass(&self) -> bool {
        self.std == 0.0
    }

    /// Same distribution with `extra` added to the standard deviation.
    ///
    /// Negative increments are ignored.
    #[must_use]
    pub fn widened(&self, extra: f64) -> Self {
        Self {
            mean: self.mean,
            std: self.std + extra.max(0.0),
        }
    }

    /// Sum of this distribution and an independent `other`.
    ///
    /// Equivalent to [`Normal::shifted_by_weighted`] with weights `[1, 1]`.
    #[must_use]
    pub fn shifted_by(&self, other: &Self) -> Self {
        self.shifted_by_weighted(other, [1.0, 1.0])
    }

    /// Weighted sum `w0 * self + w1 * other` of two independent normals.
    ///
    /// Independence between the components is assumed, so the standard
    /// deviation is `sqrt((w0 * std0)^2 + (w1 * std1)^2)`.
    #[must_use]
    pub fn shifted_by_weighted(&self, other: &Self, weights: [f64; 2]) -> Self {
        let [w0, w1] = weights;
        Self {
            mean: w0 * self.mean + w1 * other.mean,
            std: (w0 * self.std).hypot(w1 * other.std),
        }
    }

    /// Interval `mean ± 3 std`.
    #[must_use]
    pub fn support(&self) -> (f64, f64) {
        let half = SUPPORT_SIGMAS * self.std;
        (self.mean - half, self.mean + half)
    }
}

impl MarginDistribution for Normal {
    fn mean(&self) -> f64 {
        self.mean
    }

    fn probability_below(&self, x: f64) -> f64 {
        if x.is_nan() {
            return 0.0;
        }
        if self.is_point_mass() {
            return match x.partial_cmp(&self.mean) {
                Some(std::cmp::Ordering::Less) => 0.0,
                Some(std::cmp::Ordering::Equal) => 0.5,
                _ => 1.0,
            };
        }
        0.5 * (1.0 + erf((x - self.mean) / (self.std * SQRT_2)))
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.mean + self.std * standard_normal(rng)
    }
}

impl Default for Normal {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Display for Normal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N({:+.4}, {:.4})", self.mean, self.std)
    }
}

/// Draws from `N(0, 1)` with the Box–Muller transform.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // u1 in (0, 1] keeps ln finite.
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_new_rejects_negative_std() {
        assert!(Normal::new(0.0, -0.1).is_err());
        assert!(Normal::new(f64::NAN, 0.1).is_err());
        assert!(Normal::new(0.0, f64::INFINITY).is_err());
        assert!(Normal::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn test_probability_below_mean_is_half() {
        for (mean, std) in [(0.0, 1.0), (0.02, 0.01), (-0.3, 0.2), (5.0, 0.0)] {
            let n = Normal::new(mean, std).unwrap();
            assert!((n.probability_below(mean) - 0.5).abs() < 1e-6, "{n}");
        }
    }

    #[test]
    fn test_probability_below_monotonic() {
        let n = Normal::new(0.01, 0.03).unwrap();
        let mut previous = 0.0;
        for i in -400..=400 {
            let x = f64::from(i) * 0.0005;
            let p = n.probability_below(x);
            assert!(p >= previous, "not monotonic at {x}: {p} < {previous}");
            assert!((0.0..=1.0).contains(&p));
            previous = p;
        }
    }

    #[test]
    fn test_probability_below_nan_stays_in_range() {
        assert_eq!(Normal::standard().probability_below(f64::NAN), 0.0);
        assert_eq!(Normal::zero().probability_below(f64::NAN), 0.0);
    }

    #[test]
    fn test_probability_below_tails() {
        let n = Normal::standard();
        assert_eq!(n.probability_below(-40.0), 0.0);
        assert_eq!(n.probability_below(40.0), 1.0);
        assert!((n.probability_below(1.96) - 0.975).abs() < 1e-4);
    }

    #[test]
    fn test_point_mass_probability() {
        let n = Normal::new(0.1, 0.0).unwrap();
        assert_eq!(n.probability_below(0.05), 0.0);
        assert_eq!(n.probability_below(0.2), 1.0);
    }

    #[test]
    fn test_from_samples_population_std() {
        let n = Normal::from_samples(&[0.1, 0.3]).unwrap();
        assert!((n.mean() - 0.2).abs() < 1e-12);
        assert!((n.std() - 0.1).abs() < 1e-12);

        let single = Normal::from_samples(&[0.04]).unwrap();
        assert_eq!(single.std(), 0.0);

        assert_eq!(Normal::from_samples(&[]), Err(ValidationError::EmptySamples));
        assert_eq!(
            Normal::from_samples(&[0.1, f64::NAN]),
            Err(ValidationError::NonFiniteSample { index: 1 })
        );
    }

    #[test]
    fn test_shifted_by_sums_means_and_variances() {
        let national = Normal::new(0.02, 0.01).unwrap();
        let lean = Normal::new(0.05, 0.0).unwrap();
        let env = national.shifted_by(&lean);
        assert!((env.mean() - 0.07).abs() < 1e-12);
        assert!((env.std() - 0.01).abs() < 1e-12);

        let a = Normal::new(0.0, 3.0).unwrap();
        let b = Normal::new(1.0, 4.0).unwrap();
        assert!((a.shifted_by(&b).std() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_shifted_by_identity_weights() {
        let left = Normal::new(0.03, 0.02).unwrap();
        let right = Normal::new(-0.4, 0.5).unwrap();
        let out = left.shifted_by_weighted(&right, [1.0, 0.0]);
        assert!((out.mean() - left.mean()).abs() < 1e-15);
        assert!((out.std() - left.std()).abs() < 1e-15);
    }

    #[test]
    fn test_shifted_by_uses_both_weights() {
        let a = Normal::new(0.10, 0.02).unwrap();
        let b = Normal::new(-0.10, 0.04).unwrap();
        let out = a.shifted_by_weighted(&b, [0.6, 0.4]);
        assert!((out.mean() - (0.06 - 0.04)).abs() < 1e-12);
        let expected_std = ((0.6f64 * 0.02).powi(2) + (0.4f64 * 0.04).powi(2)).sqrt();
        assert!((out.std() - expected_std).abs() < 1e-12);
    }

    #[test]
    fn test_sample_seeded_is_reproducible() {
        let n = Normal::new(0.0, 1.0).unwrap();
        let mut rng1 = SmallRng::seed_from_u64(123);
        let mut rng2 = SmallRng::seed_from_u64(123);
        let a: Vec<f64> = (0..16).map(|_| n.sample(&mut rng1)).collect();
        let b: Vec<f64> = (0..16).map(|_| n.sample(&mut rng2)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sample_moments() {
        let n = Normal::new(0.05, 0.02).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let samples: Vec<f64> = (0..50_000).map(|_| n.sample(&mut rng)).collect();
        let fit = Normal::from_samples(&samples).unwrap();
        assert!((fit.mean() - 0.05).abs() < 1e-3);
        assert!((fit.std() - 0.02).abs() < 1e-3);
    }

    #[test]
    fn test_widened() {
        let n = Normal::new(0.0, 0.01).unwrap();
        assert!((n.widened(0.005).std() - 0.015).abs() < 1e-12);
        assert_eq!(n.widened(-1.0), n);
    }

    #[test]
    fn test_display() {
        let n = Normal::new(0.02, 0.01).unwrap();
        assert_eq!(format!("{n}"), "N(+0.0200, 0.0100)");
    }
}
