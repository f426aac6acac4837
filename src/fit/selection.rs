//! Weight-configuration sweep and selection of the best run.
//!
//! Each configured [`WeightPair`] gets its own optimization from the same
//! starting point. Runs are independent, so they are evaluated in parallel and
//! collected back in declaration order.
//!
//! Selection rules:
//! 1. Only converged runs with a finite cost are eligible
//! 2. Choose the minimum cost
//! 3. On an exact tie, the earlier configuration wins

use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::{EpidemicParameters, FitConfig, WeightPair, WeightRun};
use crate::error::FitError;
use crate::fit::objective::ObjectiveData;
use crate::fit::optimizer::minimize;

/// Output of the sweep.
#[derive(Debug, Clone)]
pub struct FitSelection {
    /// Index into `runs` of the selected configuration.
    pub best: usize,
    /// Every attempted configuration, in declaration order.
    pub runs: Vec<WeightRun>,
}

impl FitSelection {
    pub fn best_run(&self) -> &WeightRun {
        &self.runs[self.best]
    }
}

/// Optimize every weight configuration starting from `start`.
pub fn run_weight_sweep(
    start: &EpidemicParameters,
    observed: &[f64],
    times: &[f64],
    weight_pairs: &[WeightPair],
    config: &FitConfig,
) -> Vec<WeightRun> {
    weight_pairs
        .par_iter()
        .map(|&weights| {
            let data = ObjectiveData {
                observed,
                times,
                weights,
                ode: config.ode_options(),
            };
            minimize(start, &data, config)
        })
        .collect()
}

/// Index of the lowest-cost converged run, earliest first on ties.
pub fn select_best(runs: &[WeightRun]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, run) in runs.iter().enumerate() {
        if !(run.converged && run.cost.is_finite() && run.parameters.is_some()) {
            continue;
        }
        match best {
            Some(b) if runs[b].cost <= run.cost => {}
            _ => best = Some(idx),
        }
    }
    best
}

/// Run the sweep and pick the winner.
pub fn fit_and_select(
    start: &EpidemicParameters,
    observed: &[f64],
    times: &[f64],
    config: &FitConfig,
) -> Result<FitSelection, FitError> {
    let weight_pairs = config.resolved_weight_pairs();
    let runs = run_weight_sweep(start, observed, times, &weight_pairs, config);
    for run in &runs {
        debug!(weights = %run.weights, converged = run.converged, cost = run.cost, "weight run");
    }

    let Some(best) = select_best(&runs) else {
        return Err(FitError::Optimization {
            attempted: runs.len(),
        });
    };
    info!(
        weights = %runs[best].weights,
        cost = runs[best].cost,
        converged = runs.iter().filter(|r| r.converged).count(),
        attempted = runs.len(),
        "selected weight configuration"
    );
    Ok(FitSelection { best, runs })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(w1: f64, w2: f64, converged: bool, cost: f64) -> WeightRun {
        WeightRun {
            weights: WeightPair { w1, w2 },
            converged,
            cost,
            parameters: Some(EpidemicParameters {
                beta: 0.3,
                gamma: 0.1,
                population: 1e4,
                initial_infected: 5.0,
            }),
            iterations: 10,
            status: "lbfgs: SolverConverged".to_string(),
        }
    }

    #[test]
    fn picks_lowest_cost_among_converged() {
        let runs = vec![
            run(1.0, 0.0, true, 5.0),
            run(0.0, 1.0, false, 1.0),
            run(1.0, 1.0, true, 3.0),
        ];
        assert_eq!(select_best(&runs), Some(2));
    }

    #[test]
    fn exact_tie_prefers_declaration_order() {
        let runs = vec![
            run(1.0, 0.0, true, 2.0),
            run(0.0, 1.0, true, 2.0),
            run(1.0, 1.0, true, 2.0),
        ];
        assert_eq!(select_best(&runs), Some(0));
    }

    #[test]
    fn nothing_converged_selects_nothing() {
        let mut runs = vec![run(1.0, 0.0, false, 2.0), run(0.0, 1.0, true, f64::INFINITY)];
        assert_eq!(select_best(&runs), None);
        runs[1].parameters = None;
        runs[1].cost = 1.0;
        assert_eq!(select_best(&runs), None);
    }

    #[test]
    fn failed_sweep_reports_attempt_count() {
        // A single iteration leaves no budget to confirm convergence.
        let observed: Vec<f64> = (0..12).map(|t| 10.0 * 1.3f64.powi(t)).collect();
        let times = crate::ode::day_grid(observed.len());
        let config = FitConfig {
            max_iterations: 1,
            weight_pairs: Some(vec![WeightPair { w1: 1.0, w2: 0.0 }, WeightPair { w1: 0.0, w2: 1.0 }]),
            ..FitConfig::default()
        };
        let start = EpidemicParameters {
            beta: 2.0,
            gamma: 0.05,
            population: 1e6,
            initial_infected: 500.0,
        };
        let err = fit_and_select(&start, &observed, &times, &config).unwrap_err();
        assert_eq!(err, FitError::Optimization { attempted: 2 });
    }
}
