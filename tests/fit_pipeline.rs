use chrono::NaiveDate;

use epi_curves::data::{NoiseSpec, reduced_sir_series, with_noise};
use epi_curves::fit::level_norm;
use epi_curves::ode::OdeOptions;
use epi_curves::{
    CaseSeries, EpidemicParameters, FitConfig, FitError, FitStage, WeightPair, estimate_seed, fit,
};

const SCENARIO: [f64; 20] = [
    0.0, 0.0, 0.0, 1.0, 2.0, 4.0, 7.0, 12.0, 20.0, 31.0, 45.0, 62.0, 80.0, 97.0, 110.0, 118.0,
    122.0, 124.0, 125.0, 125.0,
];

fn march_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
}

fn truth() -> EpidemicParameters {
    EpidemicParameters {
        beta: 0.5,
        gamma: 0.2,
        population: 5_000.0,
        initial_infected: 20.0,
    }
}

#[test]
fn scenario_series_fits_with_sensible_milestones() {
    let series = CaseSeries::new("scenario", SCENARIO.to_vec());
    let result = fit(&series, march_first(), &FitConfig::default()).unwrap();

    assert_eq!(result.label, "scenario");
    assert_eq!(result.trimmed_days, 2);
    assert_eq!(result.start_date, NaiveDate::from_ymd_opt(2020, 3, 3).unwrap());
    assert_eq!(result.observed.len(), 18);
    assert_eq!(result.fitted.len(), 18);

    assert!(result.r0 > 1.0, "R0 {}", result.r0);
    assert!((result.r0 - result.parameters.beta / result.parameters.gamma).abs() < 1e-12);
    assert!(result.parameters.population >= 1_000.0 * (1.0 - 1e-9));
    assert!(result.parameters.initial_infected <= result.parameters.population);

    assert!(result.peak.day > 5 && result.peak.day < 18, "peak {}", result.peak.day);
    assert!(result.decline.day > result.peak.day, "decline {}", result.decline.day);
    assert_eq!(
        result.peak.date,
        result.start_date + chrono::Duration::days(result.peak.day)
    );

    assert!(result.quality.r_squared.is_finite() && result.quality.r_squared <= 1.0);
    assert!(result.quality.rmse >= 0.0);
    assert!(result.next_day_forecast >= result.fitted[17]);

    assert_eq!(result.runs.len(), 3);
    assert_eq!(result.runs[0].weights, WeightPair { w1: 1.0, w2: 0.0 });
    let best = result.runs.iter().find(|r| r.weights == result.weights).unwrap();
    assert!(best.converged);
    assert!(
        result
            .runs
            .iter()
            .filter(|r| r.converged)
            .all(|r| r.cost >= result.objective)
    );
}

#[test]
fn noiseless_synthetic_series_is_recovered() {
    let observed = reduced_sir_series(&truth(), 80, &OdeOptions::default()).unwrap();
    let series = CaseSeries::new("synthetic", observed);
    let result = fit(&series, march_first(), &FitConfig::default()).unwrap();

    assert_eq!(result.trimmed_days, 0);
    assert!(result.quality.r_squared > 0.999, "R2 {}", result.quality.r_squared);
    let r0_err = (result.r0 - truth().r0()).abs() / truth().r0();
    assert!(r0_err < 0.1, "R0 {} vs {}", result.r0, truth().r0());

    let rel = |fitted: f64, expected: f64| (fitted - expected).abs() / expected;
    let p = result.parameters;
    let t = truth();
    assert!(rel(p.beta, t.beta) < 0.1, "beta {}", p.beta);
    assert!(rel(p.gamma, t.gamma) < 0.1, "gamma {}", p.gamma);
    assert!(rel(p.population, t.population) < 0.1, "N {}", p.population);
    assert!(rel(p.initial_infected, t.initial_infected) < 0.1, "I0 {}", p.initial_infected);
}

#[test]
fn noisy_series_still_fits() {
    let clean = reduced_sir_series(&truth(), 70, &OdeOptions::default()).unwrap();
    let noisy = with_noise(&clean, NoiseSpec { sigma: 0.2, seed: 11 }).unwrap();
    let result = fit(&CaseSeries::new("noisy", noisy), march_first(), &FitConfig::default()).unwrap();
    assert!(result.quality.r_squared > 0.95, "R2 {}", result.quality.r_squared);
    assert!(result.r0 > 1.0);
}

#[test]
fn level_only_objective_is_the_level_residual_norm() {
    let config = FitConfig {
        weight_pairs: Some(vec![WeightPair { w1: 1.0, w2: 0.0 }]),
        ..FitConfig::default()
    };
    let result = fit(&CaseSeries::new("x", SCENARIO.to_vec()), march_first(), &config).unwrap();
    let expected = level_norm(&result.observed, &result.fitted);
    assert!(
        (result.objective - expected).abs() <= 1e-4 * expected.max(1.0),
        "{} vs {expected}",
        result.objective
    );
    assert_eq!(result.runs.len(), 1);
}

#[test]
fn seed_is_exposed_and_matches_fit_result() {
    let observed = reduced_sir_series(&truth(), 61, &OdeOptions::default()).unwrap();
    let seed = estimate_seed(&observed).unwrap();
    assert!(seed.k > 0.0 && seed.r > 0.0 && seed.a > 0.0);

    let result = fit(&CaseSeries::new("x", observed), march_first(), &FitConfig::default()).unwrap();
    assert_eq!(result.seed, seed);
    assert_eq!(result.initial_parameters, seed.to_parameters());
}

#[test]
fn error_taxonomy_maps_to_stages() {
    let decreasing = CaseSeries::new("x", vec![0.0, 2.0, 5.0, 4.0, 8.0, 9.0, 12.0]);
    let err = fit(&decreasing, march_first(), &FitConfig::default()).unwrap_err();
    assert_eq!(err.stage(), FitStage::Validating);

    let dip = CaseSeries::new("x", vec![0.0, 1.0, 2.0, 1.0, 3.0]);
    let err = fit(&dip, march_first(), &FitConfig::default()).unwrap_err();
    assert_eq!(
        err,
        FitError::NonMonotonic {
            index: 3,
            previous: 2.0,
            current: 1.0
        }
    );

    let zeros = CaseSeries::new("x", vec![0.0; 10]);
    let err = fit(&zeros, march_first(), &FitConfig::default()).unwrap_err();
    assert_eq!(
        err,
        FitError::InsufficientData {
            remaining: 0,
            required: 6
        }
    );

    let short = CaseSeries::new("x", vec![1.0, 2.0, 3.0]);
    let err = fit(&short, march_first(), &FitConfig::default()).unwrap_err();
    assert_eq!(
        err,
        FitError::InsufficientData {
            remaining: 3,
            required: 6
        }
    );
    assert_eq!(err.stage(), FitStage::Trimming);

    let doubling: Vec<f64> = (0..10).map(|i| 2f64.powi(i)).collect();
    let err = fit(&CaseSeries::new("x", doubling), march_first(), &FitConfig::default()).unwrap_err();
    assert_eq!(err.stage(), FitStage::Seeding);

    let starved = FitConfig {
        max_iterations: 1,
        ..FitConfig::default()
    };
    let err = fit(&CaseSeries::new("x", SCENARIO.to_vec()), march_first(), &starved).unwrap_err();
    assert_eq!(err, FitError::Optimization { attempted: 3 });
    assert_eq!(err.stage(), FitStage::Optimizing);

    let bad = FitConfig {
        population_cap: 0.0,
        ..FitConfig::default()
    };
    let err = fit(&CaseSeries::new("x", SCENARIO.to_vec()), march_first(), &bad).unwrap_err();
    assert_eq!(err.stage(), FitStage::Configuring);
}

#[test]
fn day_limit_uses_only_the_prefix() {
    let observed = reduced_sir_series(&truth(), 80, &OdeOptions::default()).unwrap();
    let config = FitConfig {
        day_limit: Some(50),
        ..FitConfig::default()
    };
    let result = fit(&CaseSeries::new("x", observed), march_first(), &config).unwrap();
    assert_eq!(result.observed.len(), 50);
    assert_eq!(*result.forecast_times.last().unwrap(), 50.0 + 60.0);
    assert_eq!(result.forecast.len(), 500);
}
