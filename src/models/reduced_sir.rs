//! Single-state SIR model for cumulative cases.
//!
//! With `c = C/N` and `c0 = I0/N`, eliminating S, I and R from SIR gives
//!
//! ```text
//! dC/dt = N (1 - c) (β c + γ ln((1 - c + ε) / (1 - c0 + ε)))
//! ```
//!
//! with `C(t0) = I0`. `ε` keeps the logarithm finite as `c` or `c0` approach 1.

use crate::domain::EpidemicParameters;
use crate::ode::{OdeError, OdeOptions, OdeSystem, integrate};

/// Stabilizer inside the logarithm.
pub const LOG_EPS: f64 = 1e-10;

/// Right-hand side of the reduced model for fixed parameters.
#[derive(Debug, Clone, Copy)]
pub struct ReducedSir {
    beta: f64,
    gamma: f64,
    population: f64,
    log_c0: f64,
}

impl ReducedSir {
    pub fn new(params: &EpidemicParameters) -> Self {
        let c0 = params.initial_infected / params.population;
        Self {
            beta: params.beta,
            gamma: params.gamma,
            population: params.population,
            log_c0: (1.0 - c0 + LOG_EPS).ln(),
        }
    }
}

impl OdeSystem for ReducedSir {
    fn ndim(&self) -> usize {
        1
    }

    fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let c = y[0] / self.population;
        let log_ratio = (1.0 - c + LOG_EPS).ln() - self.log_c0;
        dydt[0] = self.population * (1.0 - c) * (self.beta * c + self.gamma * log_ratio);
    }
}

/// Cumulative cases `C(t)` on `times`, starting from `C(times[0]) = I0`.
///
/// Any non-finite value anywhere in the trajectory is reported as an error, so
/// callers never see a partially valid curve.
pub fn cumulative_cases(
    params: &EpidemicParameters,
    times: &[f64],
    opts: &OdeOptions,
) -> Result<Vec<f64>, OdeError> {
    let sys = ReducedSir::new(params);
    let traj = integrate(&sys, &[params.initial_infected], times, opts)?;
    let values = traj.component(0);
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(OdeError::NonFinite { t: times[i] });
    }
    Ok(values)
}
