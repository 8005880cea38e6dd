use thiserror::Error;

/// Configuration for the NEWUOA solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    initial_radius: f64,
    final_radius: f64,
    max_evals: usize,
    interpolation_points: Option<usize>,
}

/// Errors that can occur when validating a NEWUOA solver config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("initial_radius must be finite and positive")]
    InitialRadius,

    #[error("final_radius must be finite, positive, and no larger than initial_radius")]
    FinalRadius,

    #[error("max_evals must be at least one")]
    MaxEvals,

    #[error("at least two variables are required, got {n}")]
    Dimension { n: usize },

    #[error("interpolation points must lie in [{min}, {max}], got {npt}")]
    InterpolationPoints { npt: usize, min: usize, max: usize },
}

impl Default for Config {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(1.0, 1e-6, 10_000).unwrap()
    }
}

impl Config {
    /// Creates a new config with validated radii and budget.
    ///
    /// `initial_radius` (`ρ_begin`) should be about a tenth of the expected
    /// change in the variables; `final_radius` (`ρ_end`) is the required
    /// accuracy in the variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a radius is non-finite or non-positive, if
    /// `final_radius > initial_radius`, or if `max_evals` is zero.
    pub fn new(
        initial_radius: f64,
        final_radius: f64,
        max_evals: usize,
    ) -> Result<Self, ConfigError> {
        if !initial_radius.is_finite() || initial_radius <= 0.0 {
            return Err(ConfigError::InitialRadius);
        }
        if !final_radius.is_finite() || final_radius <= 0.0 || final_radius > initial_radius {
            return Err(ConfigError::FinalRadius);
        }
        if max_evals == 0 {
            return Err(ConfigError::MaxEvals);
        }

        Ok(Self {
            initial_radius,
            final_radius,
            max_evals,
            interpolation_points: None,
        })
    }

    /// Overrides the number of interpolation points.
    ///
    /// The value is checked against the problem dimension when the solver
    /// starts, before any objective evaluation.
    #[must_use]
    pub fn with_interpolation_points(mut self, npt: usize) -> Self {
        self.interpolation_points = Some(npt);
        self
    }

    /// Returns the initial trust-region radius (`ρ_begin`).
    #[must_use]
    pub fn initial_radius(&self) -> f64 {
        self.initial_radius
    }

    /// Returns the final trust-region radius (`ρ_end`).
    #[must_use]
    pub fn final_radius(&self) -> f64 {
        self.final_radius
    }

    /// Returns the maximum number of objective evaluations.
    #[must_use]
    pub fn max_evals(&self) -> usize {
        self.max_evals
    }

    /// Returns the number of interpolation points to use for `n` variables.
    ///
    /// Defaults to `2n + 1`.
    ///
    /// # Errors
    ///
    /// Returns an error if `n < 2` or the point count falls outside
    /// `[n + 2, (n + 1)(n + 2) / 2]`.
    pub fn interpolation_points(&self, n: usize) -> Result<usize, ConfigError> {
        if n < 2 {
            return Err(ConfigError::Dimension { n });
        }
        let npt = self.interpolation_points.unwrap_or(2 * n + 1);
        let min = n + 2;
        let max = (n + 1) * (n + 2) / 2;
        if npt < min || npt > max {
            return Err(ConfigError::InterpolationPoints { npt, min, max });
        }
        Ok(npt)
    }
}
