//! Export fit results.
//!
//! - the full [`FitResult`] as pretty JSON (round-trips through [`read_result_json`])
//! - a per-day trajectory CSV that is easy to load in spreadsheets or plotting scripts

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::FitResult;
use crate::error::AppError;
use crate::report::milestone;

/// One row of the trajectory CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryRow {
    pub day: i64,
    pub date: NaiveDate,
    /// Empty past the observed horizon.
    pub observed: Option<f64>,
    pub fitted: Option<f64>,
    pub forecast: f64,
}

/// Write the full result as JSON.
pub fn write_result_json(path: &Path, result: &FitResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create result JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, result)
        .map_err(|e| AppError::new(2, format!("Failed to write result JSON: {e}")))?;
    Ok(())
}

/// Read a result JSON file written by [`write_result_json`].
pub fn read_result_json(path: &Path) -> Result<FitResult, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open result JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid result JSON: {e}")))
}

/// Per-day rows from day 0 to the end of the forecast grid.
///
/// Forecast values are linearly interpolated from the extended grid.
pub fn trajectory_rows(result: &FitResult) -> Vec<TrajectoryRow> {
    let last_day = result.forecast_times.last().copied().unwrap_or(0.0).floor() as i64;
    (0..=last_day)
        .map(|day| {
            let idx = day as usize;
            TrajectoryRow {
                day,
                date: milestone(result.start_date, day).date,
                observed: result.observed.get(idx).copied(),
                fitted: result.fitted.get(idx).copied(),
                forecast: interpolate(&result.forecast_times, &result.forecast, day as f64),
            }
        })
        .collect()
}

/// Write the trajectory CSV to any writer.
pub fn write_trajectory<W: Write>(writer: W, result: &FitResult) -> Result<(), AppError> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in trajectory_rows(result) {
        csv.serialize(&row)
            .map_err(|e| AppError::new(2, format!("Failed to write trajectory CSV row: {e}")))?;
    }
    csv.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush trajectory CSV: {e}")))?;
    Ok(())
}

/// Write the trajectory CSV to `path`.
pub fn write_trajectory_csv(path: &Path, result: &FitResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create trajectory CSV '{}': {e}", path.display())))?;
    write_trajectory(file, result)
}

fn interpolate(times: &[f64], values: &[f64], t: f64) -> f64 {
    let n = times.len().min(values.len());
    if n == 0 {
        return f64::NAN;
    }
    if t <= times[0] {
        return values[0];
    }
    if t >= times[n - 1] {
        return values[n - 1];
    }
    let hi = times[..n].partition_point(|&x| x < t);
    let lo = hi - 1;
    let span = times[hi] - times[lo];
    if span <= 0.0 {
        return values[hi];
    }
    let u = (t - times[lo]) / span;
    values[lo] + u * (values[hi] - values[lo])
}
