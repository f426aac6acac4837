//! Reporting utilities: fit statistics, milestones and the forecast projection.
//!
//! Everything here is a pure function of the fitted parameters and the
//! observed series; formatted terminal output lives in [`format`].

pub mod format;

use chrono::{Duration, NaiveDate};

use crate::domain::{EpidemicParameters, FitQuality, Milestone, first_differences};
use crate::models::cumulative_cases;
use crate::ode::{OdeError, OdeOptions, day_grid, linspace};

/// Daily rate below which the epidemic counts as winding down.
pub const DECLINE_RATE: f64 = 1.0;

/// Model trajectories derived from one parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Model on days `0..n`.
    pub fitted: Vec<f64>,
    /// Model on day `n`.
    pub next_day_forecast: f64,
    pub forecast_times: Vec<f64>,
    pub forecast: Vec<f64>,
    pub daily_fitted: Vec<f64>,
    /// `ΔC/Δt` for each interval of the forecast grid.
    pub daily_forecast: Vec<f64>,
}

/// Integrate the model over the observed days plus one, and over the extended grid
/// `[0, n + horizon_days]` with `points` samples.
pub fn project(
    params: &EpidemicParameters,
    n: usize,
    horizon_days: usize,
    points: usize,
    opts: &OdeOptions,
) -> Result<Projection, OdeError> {
    let mut fitted = cumulative_cases(params, &day_grid(n + 1), opts)?;
    let next_day_forecast = fitted.pop().unwrap_or(f64::NAN);

    let end = (n + horizon_days) as f64;
    let forecast_times = linspace(0.0, end, points);
    let forecast = cumulative_cases(params, &forecast_times, opts)?;
    let daily_forecast = grid_rates(&forecast_times, &forecast);

    Ok(Projection {
        daily_fitted: first_differences(&fitted),
        fitted,
        next_day_forecast,
        forecast_times,
        forecast,
        daily_forecast,
    })
}

/// `R² = 1 - SS_res/SS_tot` and `RMSE = sqrt(SS_res / (n - 1))`.
///
/// A constant observed series has `SS_tot = 0`; R² is then 1 for an exact
/// fit and 0 otherwise.
pub fn fit_quality(observed: &[f64], fitted: &[f64]) -> FitQuality {
    let n = observed.len().min(fitted.len());
    if n == 0 {
        return FitQuality {
            r_squared: 0.0,
            rmse: 0.0,
            n: 0,
        };
    }
    let mean = observed[..n].iter().sum::<f64>() / n as f64;
    let ss_res: f64 = observed.iter().zip(fitted).map(|(o, f)| (o - f) * (o - f)).sum();
    let ss_tot: f64 = observed[..n].iter().map(|o| (o - mean) * (o - mean)).sum();

    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };
    let rmse = (ss_res / (n.saturating_sub(1).max(1)) as f64).sqrt();
    FitQuality { r_squared, rmse, n }
}

/// Per-interval rate `(y[j+1] - y[j]) / (t[j+1] - t[j])`.
pub fn grid_rates(times: &[f64], values: &[f64]) -> Vec<f64> {
    times
        .windows(2)
        .zip(values.windows(2))
        .map(|(t, y)| {
            let dt = t[1] - t[0];
            if dt > 0.0 { (y[1] - y[0]) / dt } else { 0.0 }
        })
        .collect()
}

/// Index of the largest value, first on ties; `None` for an empty slice.
fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in values.iter().enumerate() {
        match best {
            Some(b) if values[b] >= *v => {}
            _ if v.is_nan() => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Peak day: the index of the largest in-sample daily increment.
pub fn peak_day(fitted: &[f64]) -> usize {
    argmax(&first_differences(fitted)).unwrap_or(0)
}

/// Decline day: the first forecast grid time, at or after the peak rate, whose
/// rate drops below [`DECLINE_RATE`]; the last grid time when none does.
pub fn decline_time(times: &[f64], daily_rates: &[f64]) -> f64 {
    let last = times.last().copied().unwrap_or(0.0);
    let Some(peak) = argmax(daily_rates) else {
        return last;
    };
    daily_rates[peak..]
        .iter()
        .position(|&r| r < DECLINE_RATE)
        .map_or(last, |offset| times[peak + offset])
}

/// Day offset plus its calendar date.
pub fn milestone(start_date: NaiveDate, day: i64) -> Milestone {
    Milestone {
        day,
        date: start_date + Duration::days(day),
    }
}
