//! Three-point logistic estimate used to seed the optimizer.
//!
//! For a logistic curve `C(t) = K / (1 + A e^{-r t})` sampled at `k1 < k2 < k3`
//! with `k2 - k1 = m`, the three samples determine `K`, `r` and `A` in closed
//! form. We scan `k1 = 0, 1, ...` with `k3` pinned to the last sample and `k2`
//! at the midpoint, and return the first triple whose estimate is admissible.
//!
//! The result is a heuristic starting point, not an identification of the
//! curve: different triples give different answers on real data.

use crate::domain::{LogisticSeed, MIN_FIT_POINTS};

/// Estimate `(K, r, A)` from a cumulative series.
///
/// Returns `None` for series shorter than six points, or when no triple
/// satisfies `q > 0`, `p > 0`, finite `r >= 0` and finite `A > 0`.
pub fn estimate_seed(series: &[f64]) -> Option<LogisticSeed> {
    let n = series.len();
    if n < MIN_FIT_POINTS {
        return None;
    }

    let k3 = n - 1;
    for k1 in 0..=(n - MIN_FIT_POINTS) {
        let k2 = (k1 + k3) / 2;
        if let Some(seed) = seed_from_triple(series, k1, k2, k3) {
            return Some(seed);
        }
    }
    None
}

/// Closed-form estimate for one index triple, or `None` if it is rejected.
fn seed_from_triple(series: &[f64], k1: usize, k2: usize, k3: usize) -> Option<LogisticSeed> {
    let m = k2.checked_sub(k1)?;
    if m < 1 {
        return None;
    }
    let (c1, c2, c3) = (series[k1], series[k2], series[k3]);
    if c1.is_nan() || c2.is_nan() || c3.is_nan() {
        return None;
    }

    let q = c2 * c2 - c3 * c1;
    if q <= 0.0 {
        return None;
    }
    let p = c1 * c2 - 2.0 * c1 * c3 + c2 * c3;
    if p <= 0.0 {
        return None;
    }
    let k = c2 * p / q;

    let ratio = (c3 * (c2 - c1)) / (c1 * (c3 - c2));
    let m_f = m as f64;
    let r = ratio.ln() / m_f;
    if !r.is_finite() || r < 0.0 {
        return None;
    }

    let exponent = (k3 as f64 - m_f) / m_f;
    let a = ((c3 - c2) * (c2 - c1) / q) * ratio.powf(exponent);
    if !a.is_finite() || a <= 0.0 {
        return None;
    }

    if !k.is_finite() || k <= 0.0 {
        return None;
    }

    Some(LogisticSeed {
        k,
        r,
        a,
        indices: (k1, k2, k3),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logistic(k: f64, r: f64, a: f64, n: usize) -> Vec<f64> {
        (0..n).map(|t| k / (1.0 + a * (-r * t as f64).exp())).collect()
    }

    fn rel(a: f64, b: f64) -> f64 {
        ((a - b) / b).abs()
    }

    #[test]
    fn recovers_known_logistic_parameters() {
        // Odd lengths put k2 exactly halfway between k1 = 0 and k3.
        for &(k, r, a, n) in &[
            (10_000.0, 0.25, 200.0, 41),
            (500.0, 0.4, 50.0, 21),
            (2.0e6, 0.1, 1_000.0, 121),
        ] {
            let seed = estimate_seed(&logistic(k, r, a, n)).expect("seed");
            assert_eq!(seed.indices, (0, (n - 1) / 2, n - 1));
            assert!(rel(seed.k, k) < 0.05, "K {} vs {k}", seed.k);
            assert!(rel(seed.r, r) < 0.05, "r {} vs {r}", seed.r);
            assert!(rel(seed.a, a) < 0.05, "A {} vs {a}", seed.a);
        }
    }

    #[test]
    fn uneven_spacing_still_recovers_capacity_and_rate() {
        for &(k, r, a, n) in &[(10_000.0, 0.25, 200.0, 40), (500.0, 0.4, 50.0, 20)] {
            let seed = estimate_seed(&logistic(k, r, a, n)).expect("seed");
            assert!(rel(seed.k, k) < 0.05, "K {} vs {k}", seed.k);
            assert!(rel(seed.r, r) < 0.05, "r {} vs {r}", seed.r);
            assert!(seed.a > 0.0);
        }
    }

    #[test]
    fn short_series_has_no_seed() {
        for n in 0..=5 {
            assert!(estimate_seed(&logistic(100.0, 0.5, 10.0, n)).is_none());
        }
    }

    #[test]
    fn flat_series_has_no_seed() {
        for n in [6, 10, 50] {
            assert!(estimate_seed(&vec![42.0; n]).is_none());
            assert!(estimate_seed(&vec![0.0; n]).is_none());
        }
    }

    #[test]
    fn leading_zero_is_skipped_in_favor_of_next_triple() {
        // k1 = 0 gives ln(x / 0) = inf; the scan must move on.
        let mut series = vec![0.0];
        series.extend(logistic(1_000.0, 0.3, 99.0, 30));
        let seed = estimate_seed(&series).unwrap();
        assert!(seed.indices.0 >= 1);
    }

    #[test]
    fn nan_samples_are_skipped() {
        let mut series = logistic(1_000.0, 0.3, 99.0, 30);
        series[0] = f64::NAN;
        let seed = estimate_seed(&series).unwrap();
        assert_eq!(seed.indices.0, 1);
    }
}
