//! ODE integration adapter.
//!
//! Models describe their right-hand side through [`OdeSystem`]; the rest of the
//! crate only asks for "the state at each of these times" via [`integrate`].
//!
//! - [`OdeOptions`]: tolerances and step bounds
//! - [`Trajectory`]: states aligned to the requested time grid
//! - [`dopri`]: the adaptive Dormand–Prince 4(5) stepper behind [`integrate`]

pub mod dopri;

pub use dopri::integrate;

/// Right-hand side of an ODE system `dy/dt = f(t, y)`.
pub trait OdeSystem {
    /// Number of state variables.
    fn ndim(&self) -> usize;

    /// Evaluate `f(t, y)` into `dydt`.
    ///
    /// `y` and `dydt` have length `ndim()`.
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]);
}

/// Failure of a single integration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OdeError {
    #[error("initial state has {got} components, system expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("time grid is empty")]
    EmptyGrid,

    #[error("time grid must be finite and non-decreasing (index {index})")]
    InvalidGrid { index: usize },

    #[error("invalid tolerance: {0}")]
    InvalidTolerance(&'static str),

    #[error("exceeded {max_steps} steps at t={t:.6e}")]
    StepLimitExceeded { max_steps: usize, t: f64 },

    #[error("non-finite state at t={t:.6e}")]
    NonFinite { t: f64 },
}

/// Configuration for the adaptive solver.
#[derive(Debug, Clone, PartialEq)]
pub struct OdeOptions {
    /// Relative tolerance (default: 1e-10).
    pub rtol: f64,
    /// Absolute tolerance (default: 1e-10).
    pub atol: f64,
    /// Initial step size. Set to 0.0 for automatic.
    pub h0: f64,
    /// Minimum step size (default: 1e-12).
    pub h_min: f64,
    /// Maximum step size (default: unbounded).
    pub h_max: f64,
    /// Maximum number of attempted steps over the whole grid (default: 100_000).
    pub max_steps: usize,
}

impl Default for OdeOptions {
    fn default() -> Self {
        Self {
            rtol: 1e-10,
            atol: 1e-10,
            h0: 0.0,
            h_min: 1e-12,
            h_max: f64::INFINITY,
            max_steps: 100_000,
        }
    }
}

impl OdeOptions {
    pub(crate) fn validate(&self) -> Result<(), OdeError> {
        if !self.rtol.is_finite() || self.rtol <= 0.0 {
            return Err(OdeError::InvalidTolerance("rtol must be finite and > 0"));
        }
        if !self.atol.is_finite() || self.atol <= 0.0 {
            return Err(OdeError::InvalidTolerance("atol must be finite and > 0"));
        }
        if !(self.h_min > 0.0 && self.h_max >= self.h_min) {
            return Err(OdeError::InvalidTolerance("step bounds must satisfy 0 < h_min <= h_max"));
        }
        if self.max_steps == 0 {
            return Err(OdeError::InvalidTolerance("max_steps must be > 0"));
        }
        Ok(())
    }

    pub(crate) fn initial_step(&self, span: f64) -> f64 {
        if self.h0 > 0.0 {
            self.h0.min(span)
        } else {
            (span * 1e-3).max(self.h_min).min(self.h_max).min(span)
        }
    }
}

/// States of a system sampled on a time grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub times: Vec<f64>,
    /// `states[i]` is the state at `times[i]`.
    pub states: Vec<Vec<f64>>,
}

impl Trajectory {
    /// One state component over the whole grid.
    pub fn component(&self, index: usize) -> Vec<f64> {
        self.states.iter().map(|s| s[index]).collect()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// An evenly spaced grid of `points` times covering `[start, end]`.
pub fn linspace(start: f64, end: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (points as f64 - 1.0);
            (0..points)
                .map(|i| if i + 1 == points { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Integer day grid `0, 1, ..., days - 1`.
pub fn day_grid(days: usize) -> Vec<f64> {
    (0..days).map(|d| d as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_hits_both_ends() {
        let grid = linspace(0.0, 80.0, 500);
        assert_eq!(grid.len(), 500);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[499], 80.0);
        assert!(grid.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn options_reject_bad_tolerances() {
        let opts = OdeOptions {
            rtol: 0.0,
            ..OdeOptions::default()
        };
        assert!(opts.validate().is_err());
        assert!(OdeOptions::default().validate().is_ok());
    }
}
