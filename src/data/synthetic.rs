//! Synthetic cumulative case series for demos and tests.
//!
//! Curves come either from the reduced SIR model or from a logistic. Noise is
//! multiplicative and log-normal with unit mean, applied to the daily
//! increments rather than the levels, so the noisy series stays
//! non-decreasing.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::LogNormal;

use crate::domain::EpidemicParameters;
use crate::error::AppError;
use crate::models::cumulative_cases;
use crate::ode::{OdeError, OdeOptions, day_grid};

/// Log-normal noise settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseSpec {
    /// Standard deviation of the log of each multiplier; 0 disables noise.
    pub sigma: f64,
    pub seed: u64,
}

/// Reduced SIR cumulative cases on days `0..days`.
pub fn reduced_sir_series(
    params: &EpidemicParameters,
    days: usize,
    opts: &OdeOptions,
) -> Result<Vec<f64>, OdeError> {
    cumulative_cases(params, &day_grid(days), opts)
}

/// `K / (1 + A e^{-r t})` on days `0..days`.
pub fn logistic_series(k: f64, r: f64, a: f64, days: usize) -> Vec<f64> {
    (0..days)
        .map(|t| k / (1.0 + a * (-r * t as f64).exp()))
        .collect()
}

/// Perturb the daily increments of a cumulative series.
///
/// The first value is kept; each increment is scaled by an independent
/// log-normal multiplier with mean one. Same seed, same output.
pub fn with_noise(values: &[f64], noise: NoiseSpec) -> Result<Vec<f64>, AppError> {
    let sigma = noise.sigma;
    if !(sigma.is_finite() && sigma >= 0.0) {
        return Err(AppError::new(
            2,
            format!("Invalid noise sigma {sigma}: must be finite and >= 0"),
        ));
    }
    if sigma == 0.0 || values.is_empty() {
        return Ok(values.to_vec());
    }
    let dist = LogNormal::new(-0.5 * sigma * sigma, sigma)
        .map_err(|e| AppError::new(2, format!("Invalid noise sigma {sigma}: {e}")))?;
    let mut rng = StdRng::seed_from_u64(noise.seed);

    let mut out = Vec::with_capacity(values.len());
    out.push(values[0]);
    for w in values.windows(2) {
        let increment = (w[1] - w[0]).max(0.0);
        let prev = out[out.len() - 1];
        out.push(prev + increment * dist.sample(&mut rng));
    }
    Ok(out)
}

/// Round to whole case counts; rounding keeps a non-decreasing series non-decreasing.
pub fn round_counts(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v.round()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_decreasing(values: &[f64]) -> bool {
        values.windows(2).all(|w| w[1] >= w[0])
    }

    #[test]
    fn logistic_matches_closed_form() {
        let s = logistic_series(1_000.0, 0.3, 99.0, 50);
        assert_eq!(s.len(), 50);
        assert!((s[0] - 10.0).abs() < 1e-12);
        assert!(non_decreasing(&s));
        assert!(s[49] < 1_000.0 && s[49] > 990.0);
    }

    #[test]
    fn noise_keeps_series_monotone_and_reproducible() {
        let clean = logistic_series(5_000.0, 0.25, 200.0, 60);
        let noise = NoiseSpec {
            sigma: 0.4,
            seed: 7,
        };
        let a = with_noise(&clean, noise).unwrap();
        let b = with_noise(&clean, noise).unwrap();
        assert_eq!(a, b);
        assert!(non_decreasing(&a));
        assert_eq!(a[0], clean[0]);
        assert_ne!(a, clean);

        let c = with_noise(&clean, NoiseSpec { sigma: 0.4, seed: 8 }).unwrap();
        assert_ne!(a, c);
        assert!(non_decreasing(&round_counts(&c)));
    }

    #[test]
    fn zero_sigma_is_identity() {
        let clean = logistic_series(100.0, 0.5, 10.0, 20);
        assert_eq!(with_noise(&clean, NoiseSpec { sigma: 0.0, seed: 1 }).unwrap(), clean);
    }

    #[test]
    fn negative_sigma_is_rejected() {
        let err = with_noise(&[1.0, 2.0], NoiseSpec { sigma: -0.1, seed: 1 }).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(with_noise(&[1.0, 2.0], NoiseSpec { sigma: f64::NAN, seed: 1 }).is_err());
        assert!(with_noise(&[], NoiseSpec { sigma: -1.0, seed: 1 }).is_err());
    }

    #[test]
    fn reduced_sir_series_starts_at_i0() {
        let p = EpidemicParameters {
            beta: 0.4,
            gamma: 0.1,
            population: 1e4,
            initial_infected: 3.0,
        };
        let s = reduced_sir_series(&p, 30, &OdeOptions::default()).unwrap();
        assert_eq!(s.len(), 30);
        assert_eq!(s[0], 3.0);
        assert!(non_decreasing(&s));
    }
}
