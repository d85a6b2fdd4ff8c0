//! Simulation limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Parameters bounding a Monte Carlo run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of simulated elections.
    pub iterations: usize,
    /// Grid resolution of the output margin distributions.
    pub discretization_points: usize,
    /// Run iterations across the rayon thread pool.
    pub parallel: bool,
    /// Wall-clock budget. Iterations stop at the first chunk boundary past it.
    pub max_duration_ms: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            discretization_points: 200,
            parallel: true,
            max_duration_ms: None,
        }
    }
}

impl SimulationConfig {
    /// Validate the config.
    ///
    /// This must be called before running a simulation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.iterations == 0 {
            return Err(ValidationError::InvalidSimulationConfig {
                reason: "iterations must be > 0".to_string(),
            });
        }
        if self.discretization_points < 2 {
            return Err(ValidationError::InvalidSimulationConfig {
                reason: "discretization_points must be >= 2".to_string(),
            });
        }
        if self.max_duration_ms == Some(0) {
            return Err(ValidationError::InvalidSimulationConfig {
                reason: "max_duration_ms must be > 0 when set".to_string(),
            });
        }
        Ok(())
    }

    /// The wall-clock budget, if any.
    #[must_use]
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_ms.map(Duration::from_millis)
    }
}
