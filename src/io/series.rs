//! Case series ingest.
//!
//! Accepted layouts (comma separated, `#` starts a comment line):
//!
//! - one value per line
//! - `date,value` per line, dates `YYYY-MM-DD` on consecutive days
//!
//! An optional header line is skipped. Values are cumulative counts unless
//! the caller asks for [`ValueKind::Daily`], in which case they are summed.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use clap::ValueEnum;

use crate::error::AppError;

/// How the numbers in the file should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValueKind {
    /// Running totals.
    Cumulative,
    /// New cases per day.
    Daily,
}

/// Parsed input series.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSeries {
    /// Cumulative counts.
    pub values: Vec<f64>,
    /// Date of the first value when the file carries dates.
    pub first_date: Option<NaiveDate>,
}

/// Read a series from `path`.
pub fn read_series(path: &Path, kind: ValueKind) -> Result<LoadedSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open series '{}': {e}", path.display())))?;
    parse_series(file, kind)
}

/// Parse a series from any reader.
pub fn parse_series<R: Read>(reader: R, kind: ValueKind) -> Result<LoadedSeries, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut values = Vec::new();
    let mut first_date = None;
    let mut last_date: Option<NaiveDate> = None;

    for (idx, result) in reader.records().enumerate() {
        let row = idx + 1;
        let record = result.map_err(|e| AppError::new(2, format!("Row {row}: {e}")))?;
        let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();

        let (date_field, value_field) = match fields.as_slice() {
            [] => continue,
            [value] => (None, *value),
            [date, value, ..] => (Some(*date), *value),
        };

        let Ok(value) = value_field.parse::<f64>() else {
            // Header row.
            if values.is_empty() && first_date.is_none() {
                continue;
            }
            return Err(AppError::new(2, format!("Row {row}: invalid number '{value_field}'")));
        };
        if !value.is_finite() {
            return Err(AppError::new(2, format!("Row {row}: non-finite value '{value_field}'")));
        }

        if let Some(text) = date_field {
            let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map_err(|e| AppError::new(2, format!("Row {row}: invalid date '{text}': {e}")))?;
            if let Some(prev) = last_date {
                if date != prev + Duration::days(1) {
                    return Err(AppError::new(
                        2,
                        format!("Row {row}: expected {} after {prev}, found {date}", prev + Duration::days(1)),
                    ));
                }
            } else {
                first_date = Some(date);
            }
            last_date = Some(date);
        } else if last_date.is_some() {
            return Err(AppError::new(2, format!("Row {row}: missing date")));
        }

        values.push(value);
    }

    if kind == ValueKind::Daily {
        let mut total = 0.0;
        for v in values.iter_mut() {
            total += *v;
            *v = total;
        }
    }

    Ok(LoadedSeries { values, first_date })
}
