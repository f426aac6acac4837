//! Fit orchestration for one cumulative case series.
//!
//! Given:
//! - cumulative daily counts `C_0..C_{n-1}`
//! - the calendar date of `C_0`
//! - a [`FitConfig`]
//!
//! we run the stages in order (configure, validate, trim, seed, optimize,
//! project) and either return a complete [`FitResult`] or the first
//! [`FitError`] raised. No stage is skipped and nothing partial is returned.

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, instrument};

use crate::domain::{CaseSeries, FitConfig, FitResult, MIN_FIT_POINTS, first_differences};
use crate::error::FitError;
use crate::fit::seed::estimate_seed;
use crate::fit::selection::fit_and_select;
use crate::ode::day_grid;
use crate::report::{decline_time, fit_quality, milestone, peak_day, project};

/// Series left after dropping the flat start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trimmed<'a> {
    pub values: &'a [f64],
    /// Leading points dropped.
    pub dropped: usize,
}

/// First `day_limit` observations, or all of them.
pub fn apply_day_limit(values: &[f64], day_limit: Option<usize>) -> &[f64] {
    match day_limit {
        Some(limit) if limit < values.len() => &values[..limit],
        _ => values,
    }
}

/// Reject series that decrease or hold non-finite values.
pub fn validate_monotone(values: &[f64]) -> Result<(), FitError> {
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(FitError::NonMonotonic {
            index,
            previous: if index > 0 { values[index - 1] } else { f64::NAN },
            current: values[index],
        });
    }
    match values.windows(2).position(|w| w[1] < w[0]) {
        Some(i) => Err(FitError::NonMonotonic {
            index: i + 1,
            previous: values[i],
            current: values[i + 1],
        }),
        None => Ok(()),
    }
}

/// Drop the flat start of a series.
///
/// The flat start is the run of leading values equal to the first one. The
/// last point of that run is kept as time zero; an entirely flat series
/// trims to nothing.
pub fn trim_flat_start(values: &[f64]) -> Trimmed<'_> {
    let Some(&first) = values.first() else {
        return Trimmed { values, dropped: 0 };
    };
    let run = values.iter().take_while(|&&v| v == first).count();
    if run == values.len() {
        return Trimmed {
            values: &values[values.len()..],
            dropped: values.len(),
        };
    }
    let dropped = run - 1;
    Trimmed {
        values: &values[dropped..],
        dropped,
    }
}

/// Fit the reduced SIR model to `series`, whose first value is dated
/// `reference_date`.
#[instrument(skip_all, fields(label = %series.label, n = series.len()))]
pub fn fit(
    series: &CaseSeries,
    reference_date: NaiveDate,
    config: &FitConfig,
) -> Result<FitResult, FitError> {
    config.validate()?;

    let values = apply_day_limit(&series.values, config.day_limit);
    validate_monotone(values)?;

    let trimmed = trim_flat_start(values);
    let observed = trimmed.values;
    let n = observed.len();
    if n < MIN_FIT_POINTS {
        return Err(FitError::InsufficientData {
            remaining: n,
            required: MIN_FIT_POINTS,
        });
    }
    let start_date = reference_date + Duration::days(trimmed.dropped as i64);
    debug!(dropped = trimmed.dropped, remaining = n, %start_date, "trimmed flat start");

    let seed = estimate_seed(observed).ok_or(FitError::SeedEstimation { len: n })?;
    let initial_parameters = seed.to_parameters();
    debug!(?seed, ?initial_parameters, "logistic seed");

    let times = day_grid(n);
    let selection = fit_and_select(&initial_parameters, observed, &times, config)?;
    let best = selection.best_run();
    let parameters = best.parameters.ok_or(FitError::Optimization {
        attempted: selection.runs.len(),
    })?;
    let weights = best.weights;
    let objective = best.cost;

    let projection = project(
        &parameters,
        n,
        config.forecast_horizon_days,
        config.forecast_points,
        &config.ode_options(),
    )
    .map_err(|e| FitError::Projection {
        reason: e.to_string(),
    })?;

    let quality = fit_quality(observed, &projection.fitted);
    let peak = milestone(start_date, peak_day(&projection.fitted) as i64);
    let decline_day = decline_time(&projection.forecast_times, &projection.daily_forecast).floor();
    let decline = milestone(start_date, decline_day as i64);

    info!(
        r0 = parameters.r0(),
        beta = parameters.beta,
        gamma = parameters.gamma,
        population = parameters.population,
        i0 = parameters.initial_infected,
        r_squared = quality.r_squared,
        peak_day = peak.day,
        decline_day = decline.day,
        "fit complete"
    );

    Ok(FitResult {
        label: series.label.clone(),
        start_date,
        trimmed_days: trimmed.dropped,
        r0: parameters.r0(),
        parameters,
        seed,
        initial_parameters,
        daily_observed: first_differences(observed),
        observed: observed.to_vec(),
        fitted: projection.fitted,
        forecast_times: projection.forecast_times,
        forecast: projection.forecast,
        next_day_forecast: projection.next_day_forecast,
        quality,
        daily_fitted: projection.daily_fitted,
        daily_forecast: projection.daily_forecast,
        peak,
        decline,
        weights,
        objective,
        runs: selection.runs,
    })
}
