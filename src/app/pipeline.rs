//! Shared pipeline logic behind the CLI subcommands.
//!
//! Keeping this in one place avoids mixing the workflow with presentation:
//! ingest -> validate/trim -> seed -> fit -> result
//!
//! `app` then only decides what to print and export.

use chrono::NaiveDate;
use tracing::info;

use crate::cli::{InputArgs, SimulateArgs};
use crate::data::{NoiseSpec, reduced_sir_series, round_counts, with_noise};
use crate::domain::{CaseSeries, EpidemicParameters, FitConfig, FitResult, LogisticSeed, MIN_FIT_POINTS};
use crate::error::{AppError, FitError};
use crate::fit::{estimate_seed, fit, trim_flat_start, validate_monotone};
use crate::io::{LoadedSeries, read_series};

/// Load the input series named on the command line.
pub fn load_input(input: &InputArgs) -> Result<LoadedSeries, AppError> {
    let loaded = read_series(&input.input, input.values)?;
    info!(path = %input.input.display(), n = loaded.values.len(), "loaded series");
    Ok(loaded)
}

/// Fit a loaded series. `start` wins over a date found in the file.
pub fn run_fit(
    loaded: LoadedSeries,
    start: Option<NaiveDate>,
    label: &str,
    config: &FitConfig,
) -> Result<FitResult, AppError> {
    let reference_date = start.or(loaded.first_date).ok_or_else(|| {
        AppError::new(2, "No start date: pass --start or use a file with `date,value` rows.")
    })?;
    let series = CaseSeries::new(label, loaded.values);
    Ok(fit(&series, reference_date, config)?)
}

/// Seed estimate for a series after the same validation and trimming `fit` applies.
pub fn run_seed(values: &[f64]) -> Result<LogisticSeed, AppError> {
    validate_monotone(values)?;
    let trimmed = trim_flat_start(values);
    if trimmed.values.len() < MIN_FIT_POINTS {
        return Err(FitError::InsufficientData {
            remaining: trimmed.values.len(),
            required: MIN_FIT_POINTS,
        }
        .into());
    }
    let seed = estimate_seed(trimmed.values).ok_or(FitError::SeedEstimation {
        len: trimmed.values.len(),
    })?;
    Ok(seed)
}

/// Simulated cumulative series, with optional noise and rounding.
pub fn run_simulate(args: &SimulateArgs) -> Result<Vec<f64>, AppError> {
    let params = EpidemicParameters {
        beta: args.beta,
        gamma: args.gamma,
        population: args.population,
        initial_infected: args.i0,
    };
    let finite = [params.beta, params.gamma, params.population, params.initial_infected]
        .iter()
        .all(|v| v.is_finite());
    if !(finite
        && params.beta > 0.0
        && params.gamma > 0.0
        && params.initial_infected > 0.0
        && params.population >= params.initial_infected)
    {
        return Err(AppError::new(
            2,
            "Simulation needs beta, gamma, i0 > 0 and population >= i0.",
        ));
    }
    let values = reduced_sir_series(&params, args.days, &FitConfig::default().ode_options())
        .map_err(|e| AppError::new(4, format!("Simulation failed: {e}")))?;
    let values = with_noise(
        &values,
        NoiseSpec {
            sigma: args.noise,
            seed: args.seed,
        },
    )?;
    Ok(if args.round { round_counts(&values) } else { values })
}
