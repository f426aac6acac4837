//! Bounded minimization of the fit objective with `argmin`.
//!
//! The search runs over an unconstrained vector `θ ∈ ℝ⁴` that maps smoothly
//! onto the admissible box:
//!
//! ```text
//! β    = β_min + softplus(θ0)
//! γ    = γ_min + softplus(θ1)
//! ln N = ln N_min + (ln N_max - ln N_min) · σ(θ2)
//! ln I0 = ln N · σ(θ3)                         (1 <= I0 <= N)
//! ```
//!
//! Gradients are central finite differences of the cost, falling back to
//! forward differences when the central stencil lands on an invalid point.
//! If L-BFGS errors out, the same start is retried with Nelder–Mead.
//!
//! The logistic and softplus maps flatten out far from the origin, where the
//! gradient vanishes without the point being a minimum. Two rules keep a run
//! from stopping there:
//!
//! - every pass rescales the cost so the gradient at its start has norm at most
//!   [`FIRST_STEP`], and line searches never step past the proposed direction
//! - a run only counts as converged once a fresh pass from its end point fails
//!   to lower the cost; all passes share the iteration cap

use std::cell::Cell;

use argmin::core::{
    CostFunction, Error, Executor, Gradient, IterState, Solver, State, TerminationReason,
};
use argmin::solver::linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch};
use argmin::solver::neldermead::NelderMead;
use argmin::solver::quasinewton::LBFGS;
use finitediff::FiniteDiff;
use nalgebra::DVector;
use tracing::{debug, warn};

use crate::domain::{EpidemicParameters, FitConfig, LineSearch, RATE_FLOOR, WeightRun};
use crate::fit::objective::{ObjectiveData, objective};

/// Unconstrained search vector.
pub type Theta = Vec<f64>;

type LbfgsState = IterState<Theta, Theta, (), (), (), f64>;
type SimplexState = IterState<Theta, (), (), (), (), f64>;

pub type LbfgsMoreThuente = LBFGS<MoreThuenteLineSearch<Theta, Theta, f64>, Theta, Theta, f64>;
pub type LbfgsHagerZhang = LBFGS<HagerZhangLineSearch<Theta, Theta, f64>, Theta, Theta, f64>;

/// Scaled cost assigned to points where the model cannot be evaluated.
const PENALTY: f64 = 1e10;

/// Distance kept from the edges of the logistic maps when seeding.
const INTERIOR_MARGIN: f64 = 1e-9;

/// Above this, softplus and its inverse are the identity to double precision.
const SOFTPLUS_LINEAR: f64 = 20.0;

/// Initial simplex edge length in θ-space.
const SIMPLEX_STEP: f64 = 0.5;

/// Longest θ-step the first line search of a pass can take.
pub const FIRST_STEP: f64 = 1.0;

/// Line-search step lengths are capped at the full quasi-Newton step.
const MAX_STEP_LENGTH: f64 = 1.0;

/// Restarts before a run that keeps improving is given up on.
const MAX_PASSES: usize = 10;

/// Relative cost drop between passes that counts as progress.
const PASS_RTOL: f64 = 1e-8;

fn softplus(x: f64) -> f64 {
    if x > SOFTPLUS_LINEAR { x } else { x.exp().ln_1p() }
}

fn softplus_inv(y: f64) -> f64 {
    if y > SOFTPLUS_LINEAR { y } else { y.exp_m1().ln() }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

fn logit(u: f64) -> f64 {
    (u / (1.0 - u)).ln()
}

/// The admissible parameter box and its reparametrization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchBounds {
    pub rate_floor: f64,
    pub population_floor: f64,
    pub population_cap: f64,
}

impl SearchBounds {
    pub fn from_config(config: &FitConfig) -> Self {
        Self {
            rate_floor: RATE_FLOOR,
            population_floor: config.population_floor,
            population_cap: config.population_cap,
        }
    }

    fn log_range(&self) -> (f64, f64) {
        (self.population_floor.ln(), self.population_cap.ln())
    }

    /// Map a search vector onto parameters inside the box.
    pub fn to_parameters(&self, theta: &[f64]) -> EpidemicParameters {
        let (lo, hi) = self.log_range();
        let log_n = lo + (hi - lo) * sigmoid(theta[2]);
        let log_i0 = log_n * sigmoid(theta[3]);
        EpidemicParameters {
            beta: self.rate_floor + softplus(theta[0]),
            gamma: self.rate_floor + softplus(theta[1]),
            population: log_n.exp(),
            initial_infected: log_i0.exp(),
        }
    }

    /// Inverse of [`SearchBounds::to_parameters`], after clamping `params`
    /// into the interior of the box.
    pub fn to_theta(&self, params: &EpidemicParameters) -> Theta {
        let (lo, hi) = self.log_range();
        let u = ((params.population.ln() - lo) / (hi - lo))
            .clamp(INTERIOR_MARGIN, 1.0 - INTERIOR_MARGIN);
        let log_n = lo + (hi - lo) * u;
        let v = (params.initial_infected.max(1.0).ln() / log_n)
            .clamp(INTERIOR_MARGIN, 1.0 - INTERIOR_MARGIN);
        vec![
            softplus_inv((params.beta - self.rate_floor).max(INTERIOR_MARGIN)),
            softplus_inv((params.gamma - self.rate_floor).max(INTERIOR_MARGIN)),
            logit(u),
            logit(v),
        ]
    }
}

/// The objective in θ-space, scaled by the size of the observations.
pub struct SirProblem<'a> {
    data: &'a ObjectiveData<'a>,
    bounds: SearchBounds,
    scale: f64,
}

impl<'a> SirProblem<'a> {
    pub fn new(data: &'a ObjectiveData<'a>, bounds: SearchBounds) -> Self {
        let scale = DVector::from_column_slice(data.observed).norm().max(1.0);
        Self {
            data,
            bounds,
            scale,
        }
    }

    /// Raise the scale so the gradient at `theta` has norm at most [`FIRST_STEP`].
    pub fn rescaled_at(mut self, theta: &Theta) -> Self {
        if let Ok(grad) = self.gradient(theta) {
            let norm = DVector::from_column_slice(&grad).norm();
            if norm.is_finite() && norm > FIRST_STEP {
                self.scale *= norm / FIRST_STEP;
            }
        }
        self
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    fn scaled_cost(&self, theta: &[f64]) -> Option<f64> {
        let cost = objective(&self.bounds.to_parameters(theta), self.data);
        cost.is_finite().then_some(cost / self.scale)
    }
}

impl CostFunction for SirProblem<'_> {
    type Param = Theta;
    type Output = f64;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.scaled_cost(theta).unwrap_or(PENALTY))
    }
}

impl Gradient for SirProblem<'_> {
    type Param = Theta;
    type Gradient = Theta;

    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let hit_invalid = Cell::new(false);
        let cost = |t: &Theta| -> f64 {
            self.scaled_cost(t).unwrap_or_else(|| {
                hit_invalid.set(true);
                PENALTY
            })
        };
        let mut grad = theta.central_diff(&cost);
        if hit_invalid.replace(false) || grad.iter().any(|g| !g.is_finite()) {
            grad = theta.forward_diff(&cost);
        }
        for g in grad.iter_mut().filter(|g| !g.is_finite()) {
            *g = 0.0;
        }
        Ok(grad)
    }
}

/// Final state of one solver invocation.
#[derive(Debug, Clone)]
struct SolverReport {
    theta: Option<Theta>,
    iterations: u64,
    reason: Option<TerminationReason>,
}

impl SolverReport {
    fn from_state<I: State<Param = Theta>>(state: &I) -> Self {
        Self {
            theta: state.get_best_param().cloned(),
            iterations: state.get_iter(),
            reason: state.get_termination_reason().cloned(),
        }
    }

    fn converged(&self) -> bool {
        matches!(
            self.reason,
            Some(TerminationReason::SolverConverged | TerminationReason::TargetCostReached)
        )
    }
}

fn step_bounds() -> (f64, f64) {
    (f64::EPSILON.sqrt(), MAX_STEP_LENGTH)
}

pub fn build_more_thuente(config: &FitConfig) -> Result<LbfgsMoreThuente, Error> {
    let (step_min, step_max) = step_bounds();
    let linesearch = MoreThuenteLineSearch::new().with_bounds(step_min, step_max)?;
    LBFGS::new(linesearch, config.lbfgs_memory)
        .with_tolerance_grad(config.grad_tolerance)?
        .with_tolerance_cost(config.cost_tolerance)
}

pub fn build_hager_zhang(config: &FitConfig) -> Result<LbfgsHagerZhang, Error> {
    let (step_min, step_max) = step_bounds();
    let linesearch = HagerZhangLineSearch::new().with_bounds(step_min, step_max)?;
    LBFGS::new(linesearch, config.lbfgs_memory)
        .with_tolerance_grad(config.grad_tolerance)?
        .with_tolerance_cost(config.cost_tolerance)
}

fn run_lbfgs<'a, S>(
    problem: SirProblem<'a>,
    solver: S,
    theta0: Theta,
    max_iters: u64,
) -> Result<SolverReport, Error>
where
    S: Solver<SirProblem<'a>, LbfgsState> + Send + 'static,
{
    let result = Executor::new(problem, solver)
        .configure(|state| state.param(theta0).max_iters(max_iters))
        .run()?;
    Ok(SolverReport::from_state(result.state()))
}

fn run_simplex(
    problem: SirProblem<'_>,
    theta0: &Theta,
    max_iters: u64,
    config: &FitConfig,
) -> Result<SolverReport, Error> {
    let mut simplex = vec![theta0.clone()];
    for i in 0..theta0.len() {
        let mut vertex = theta0.clone();
        vertex[i] += SIMPLEX_STEP;
        simplex.push(vertex);
    }
    let solver: NelderMead<Theta, f64> =
        NelderMead::new(simplex).with_sd_tolerance(config.cost_tolerance.max(f64::EPSILON))?;
    let result = Executor::new(problem, solver)
        .configure(|state: SimplexState| state.max_iters(max_iters))
        .run()?;
    Ok(SolverReport::from_state(result.state()))
}

/// One solver pass from `theta`, with the cost rescaled at that point.
fn run_pass(
    data: &ObjectiveData<'_>,
    bounds: SearchBounds,
    theta: &Theta,
    max_iters: u64,
    config: &FitConfig,
) -> Result<(&'static str, SolverReport), Error> {
    let problem = || SirProblem::new(data, bounds).rescaled_at(theta);
    let lbfgs = match config.line_search {
        LineSearch::MoreThuente => build_more_thuente(config)
            .and_then(|solver| run_lbfgs(problem(), solver, theta.clone(), max_iters)),
        LineSearch::HagerZhang => build_hager_zhang(config)
            .and_then(|solver| run_lbfgs(problem(), solver, theta.clone(), max_iters)),
    };
    match lbfgs {
        Ok(report) => Ok(("lbfgs", report)),
        Err(err) => {
            warn!(weights = %data.weights, error = %err, "L-BFGS failed, retrying with Nelder-Mead");
            run_simplex(problem(), theta, max_iters, config).map(|report| ("nelder-mead", report))
        }
    }
}

/// Minimize the objective for one weight configuration, starting at `start`.
///
/// Passes are repeated from the best point so far until one of them converges
/// without lowering the cost. Never fails: errors are folded into a
/// non-converged [`WeightRun`].
pub fn minimize(
    start: &EpidemicParameters,
    data: &ObjectiveData<'_>,
    config: &FitConfig,
) -> WeightRun {
    let bounds = SearchBounds::from_config(config);
    let cost_at = |theta: &[f64]| objective(&bounds.to_parameters(theta), data);

    let mut theta = bounds.to_theta(start);
    let mut cost = cost_at(&theta);
    let mut iterations = 0u64;
    let mut converged = false;
    let mut status = String::from("not started");

    for pass in 0..MAX_PASSES {
        let budget = config.max_iterations.saturating_sub(iterations);
        if budget == 0 {
            status = format!("iteration cap reached after {pass} passes");
            break;
        }

        let (solver, report) = match run_pass(data, bounds, &theta, budget, config) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(weights = %data.weights, error = %err, "optimization run failed");
                return WeightRun {
                    weights: data.weights,
                    converged: false,
                    cost: f64::INFINITY,
                    parameters: None,
                    iterations,
                    status: format!("error: {err}"),
                };
            }
        };
        iterations += report.iterations;
        status = match &report.reason {
            Some(reason) => format!("{solver}: {reason:?}"),
            None => format!("{solver}: not terminated"),
        };

        let candidate = report.theta.clone().unwrap_or_else(|| theta.clone());
        let candidate_cost = cost_at(&candidate);
        let improved = cost - candidate_cost > PASS_RTOL * cost.abs() + config.cost_tolerance;
        if candidate_cost <= cost {
            theta = candidate;
            cost = candidate_cost;
        }
        debug!(weights = %data.weights, pass, cost, improved, %status, "optimization pass");

        if !report.converged() {
            break;
        }
        if pass > 0 && !improved {
            converged = cost.is_finite();
            status = format!("{status} ({} passes)", pass + 1);
            break;
        }
        if pass + 1 == MAX_PASSES {
            status = format!("{status}; still improving after {MAX_PASSES} passes");
        }
    }

    let parameters = cost.is_finite().then(|| bounds.to_parameters(&theta));
    if converged {
        debug!(weights = %data.weights, cost, iterations, %status, "optimization run converged");
    } else {
        warn!(
            weights = %data.weights,
            cost,
            iterations,
            %status,
            "weight configuration excluded: no convergence"
        );
    }

    WeightRun {
        weights: data.weights,
        converged,
        cost,
        parameters,
        iterations,
        status,
    }
}
