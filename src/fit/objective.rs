//! Weighted residual objective minimized by the optimizer.
//!
//! ```text
//! cost = c1 · ‖C − sol‖₂ + c2 · ‖ΔC − Δsol‖₂
//! ```
//!
//! where `Δ` is the first difference (daily increments) and `(c1, c2)` are the
//! normalized weights. Any integration failure or non-finite trajectory value
//! makes the whole evaluation `+∞`.

use nalgebra::DVector;

use crate::domain::{EpidemicParameters, WeightPair, first_differences};
use crate::models::cumulative_cases;
use crate::ode::OdeOptions;

/// Observed data and settings an objective evaluation needs.
#[derive(Debug, Clone)]
pub struct ObjectiveData<'a> {
    pub observed: &'a [f64],
    pub times: &'a [f64],
    pub weights: WeightPair,
    pub ode: OdeOptions,
}

/// Evaluate the objective at `params`.
pub fn objective(params: &EpidemicParameters, data: &ObjectiveData<'_>) -> f64 {
    match cumulative_cases(params, data.times, &data.ode) {
        Ok(sol) => weighted_cost(data.observed, &sol, data.weights),
        Err(_) => f64::INFINITY,
    }
}

/// Cost of a given trajectory against the observations.
///
/// Returns `+∞` when the lengths differ or any value is non-finite.
pub fn weighted_cost(observed: &[f64], sol: &[f64], weights: WeightPair) -> f64 {
    if observed.len() != sol.len() || sol.iter().any(|v| !v.is_finite()) {
        return f64::INFINITY;
    }
    let (c1, c2) = weights.normalized();
    let f1 = level_norm(observed, sol);
    let f2 = increment_norm(observed, sol);
    let cost = c1 * f1 + c2 * f2;
    if cost.is_finite() { cost } else { f64::INFINITY }
}

/// `‖C − sol‖₂`.
pub fn level_norm(observed: &[f64], sol: &[f64]) -> f64 {
    let obs = DVector::from_column_slice(observed);
    let fit = DVector::from_column_slice(sol);
    (obs - fit).norm()
}

/// `‖ΔC − Δsol‖₂`; zero for series shorter than two points.
pub fn increment_norm(observed: &[f64], sol: &[f64]) -> f64 {
    let obs = DVector::from_vec(first_differences(observed));
    let fit = DVector::from_vec(first_differences(sol));
    (obs - fit).norm()
}
