//! Error types for ballotcast.
//!
//! Errors are strongly typed using thiserror and split by how a caller is
//! expected to react:
//! - [`ValidationError`]: a usage or configuration mistake. Fix the call site.
//! - [`ModelError`]: a global precondition of a computation does not hold
//!   (no national polling, unusable historical batch). The whole computation stops.
//!
//! Missing polling for a single contest is not an error at all: it surfaces
//! as `None` and is absorbed by the no-polling uncertainty floor.

use thiserror::Error;

/// Validation errors raised when parameters or inputs are misused.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Cannot build a distribution from an empty sample array")]
    EmptySamples,

    #[error("Sample array contains a non-finite value at index {index}")]
    NonFiniteSample {
        index: usize,
    },

    #[error("Discretization needs at least {min} points, got {actual}")]
    TooFewPoints {
        min: usize,
        actual: usize,
    },

    #[error("Flathead combination requires exactly 2 distributions, got {actual}")]
    FlatheadArity {
        actual: usize,
    },

    #[error("Got {weights} weights for {inputs} distributions")]
    WeightCountMismatch {
        inputs: usize,
        weights: usize,
    },

    #[error("Combination weights must be non-negative and sum to a positive value")]
    InvalidWeights,

    #[error("Parameter '{field}' = {value} is out of range: {reason}")]
    OutOfRange {
        field: String,
        value: f64,
        reason: String,
    },

    #[error("Invalid simulation config: {reason}")]
    InvalidSimulationConfig {
        reason: String,
    },

    #[error("Malformed input: {reason}")]
    MalformedInput {
        reason: String,
    },
}

impl ValidationError {
    /// Builds an [`ValidationError::OutOfRange`] for a named parameter.
    #[must_use]
    pub fn out_of_range(field: impl Into<String>, value: f64, reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            field: field.into(),
            value,
            reason: reason.into(),
        }
    }
}

/// Global preconditions that abort a race computation or simulation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("No national polls within the last {window_days} days; the national ballot is required")]
    NoNationalPolling {
        window_days: u32,
    },

    #[error("Historical results batch is empty")]
    EmptyHistory,

    #[error("Base contests have no recorded votes; cannot derive a national environment")]
    ZeroEnvironmentTotal,

    #[error("Contest '{contest}' has unusable historical totals: {reason}")]
    InvalidHistory {
        contest: String,
        reason: String,
    },

    #[error("Contest '{contest}' is missing from the precomputed race output")]
    MissingContest {
        contest: String,
    },
}

/// Top-level error type for ballotcast.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForecastError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ForecastError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a model precondition error.
    #[must_use]
    pub const fn is_model(&self) -> bool {
        matches!(self, Self::Model(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for ballotcast operations.
pub type ForecastResult<T> = Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_points() {
        let err = ValidationError::TooFewPoints { min: 2, actual: 1 };
        let msg = format!("{err}");
        assert!(msg.contains("at least 2"));
        assert!(msg.contains("got 1"));
    }

    #[test]
    fn test_validation_error_out_of_range() {
        let err = ValidationError::out_of_range("contest_elasticity", 1.5, "must be in [0, 1]");
        let msg = format!("{err}");
        assert!(msg.contains("contest_elasticity"));
        assert!(msg.contains("1.5"));
    }

    #[test]
    fn test_model_error_no_national_polling() {
        let err = ModelError::NoNationalPolling { window_days: 30 };
        let msg = format!("{err}");
        assert!(msg.contains("30 days"));
        assert!(msg.contains("national"));
    }

    #[test]
    fn test_forecast_error_from_validation() {
        let err: ForecastError = ValidationError::EmptySamples.into();
        assert!(err.is_validation());
        assert!(!err.is_model());
    }

    #[test]
    fn test_forecast_error_from_model() {
        let err: ForecastError = ModelError::EmptyHistory.into();
        assert!(err.is_model());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_forecast_error_internal() {
        let err = ForecastError::internal("unexpected state");
        assert!(err.is_internal());
        assert!(format!("{err}").contains("unexpected state"));
    }
}
