//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - loaded from a TOML config file (`FitConfig`)

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::ode::OdeOptions;

/// Minimum number of points the seed estimator needs.
pub const MIN_FIT_POINTS: usize = 6;

/// Lower bound used for β and γ during the search.
pub const RATE_FLOOR: f64 = 1e-6;

/// Cumulative confirmed cases, one value per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSeries {
    /// Free-form label (country, region); passed through to the result.
    pub label: String,
    pub values: Vec<f64>,
}

impl CaseSeries {
    pub fn new(label: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Daily increments (first differences), length `n - 1`.
    pub fn daily(&self) -> Vec<f64> {
        first_differences(&self.values)
    }
}

/// `x[i+1] - x[i]` for consecutive pairs.
pub fn first_differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Three-point logistic estimate `C(t) ≈ K / (1 + A·e^{-r t})`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticSeed {
    /// Carrying capacity.
    pub k: f64,
    /// Growth rate.
    pub r: f64,
    /// Shape/offset.
    pub a: f64,
    /// Sample indices `(k1, k2, k3)` the estimate came from.
    pub indices: (usize, usize, usize),
}

impl LogisticSeed {
    /// Starting epidemic parameters: `I0 = K/(A+1)`, `N = 2K`, `γ = 2r`, `β = 1.5γ`.
    pub fn to_parameters(&self) -> EpidemicParameters {
        let gamma = 2.0 * self.r;
        EpidemicParameters {
            beta: 1.5 * gamma,
            gamma,
            population: 2.0 * self.k,
            initial_infected: self.k / (self.a + 1.0),
        }
    }
}

/// Parameters of the reduced SIR model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpidemicParameters {
    /// Transmission rate β.
    pub beta: f64,
    /// Recovery rate γ.
    pub gamma: f64,
    /// Effective population size N.
    pub population: f64,
    /// Initial infections I0.
    pub initial_infected: f64,
}

impl EpidemicParameters {
    /// Basic reproduction number `β / γ`.
    pub fn r0(&self) -> f64 {
        self.beta / self.gamma
    }
}

/// Weights of the level (`w1`) and daily-increment (`w2`) residual terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightPair {
    pub w1: f64,
    pub w2: f64,
}

impl WeightPair {
    /// Validated constructor: both weights finite and non-negative, sum positive.
    pub fn new(w1: f64, w2: f64) -> Result<Self, FitError> {
        let pair = Self { w1, w2 };
        pair.validate()?;
        Ok(pair)
    }

    pub fn validate(&self) -> Result<(), FitError> {
        if !(self.w1.is_finite() && self.w2.is_finite()) {
            return Err(FitError::invalid_config("weight_pairs", "weights must be finite"));
        }
        if self.w1 < 0.0 || self.w2 < 0.0 {
            return Err(FitError::invalid_config("weight_pairs", "weights must be non-negative"));
        }
        if self.w1 + self.w2 <= 0.0 {
            return Err(FitError::invalid_config("weight_pairs", "w1 + w2 must be positive"));
        }
        Ok(())
    }

    /// Normalized coefficients `(c1, c2)` summing to one.
    pub fn normalized(&self) -> (f64, f64) {
        let total = self.w1 + self.w2;
        (self.w1 / total, self.w2 / total)
    }

    /// Level-only, trend-only and blended objectives, in that order.
    pub fn defaults() -> Vec<WeightPair> {
        vec![
            WeightPair { w1: 1.0, w2: 0.0 },
            WeightPair { w1: 0.0, w2: 1.0 },
            WeightPair { w1: 1.0, w2: 1.0 },
        ]
    }
}

impl std::fmt::Display for WeightPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.w1, self.w2)
    }
}

/// Line search used inside L-BFGS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LineSearch {
    MoreThuente,
    HagerZhang,
}

/// Everything a `fit` call can be tuned with.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitConfig {
    /// Upper bound for N (and I0).
    pub population_cap: f64,
    /// Lower bound for N.
    pub population_floor: f64,
    /// Only use the first `day_limit` observations.
    pub day_limit: Option<usize>,
    /// Explicit weight configurations; `None` means [`WeightPair::defaults`].
    pub weight_pairs: Option<Vec<WeightPair>>,
    /// Iteration cap per optimization run.
    pub max_iterations: u64,
    /// Days simulated past the last observation.
    pub forecast_horizon_days: usize,
    /// Number of points on the extended forecast grid.
    pub forecast_points: usize,
    pub grad_tolerance: f64,
    pub cost_tolerance: f64,
    pub line_search: LineSearch,
    pub lbfgs_memory: usize,
    pub ode_rtol: f64,
    pub ode_atol: f64,
    pub ode_max_steps: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            population_cap: 12e6,
            population_floor: 1e3,
            day_limit: None,
            weight_pairs: None,
            max_iterations: 10_000,
            forecast_horizon_days: 60,
            forecast_points: 500,
            grad_tolerance: 1e-6,
            cost_tolerance: 1e-10,
            line_search: LineSearch::MoreThuente,
            lbfgs_memory: 7,
            ode_rtol: 1e-10,
            ode_atol: 1e-10,
            ode_max_steps: 100_000,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<(), FitError> {
        if !(self.population_floor.is_finite() && self.population_floor >= 1.0) {
            return Err(FitError::invalid_config("population_floor", "must be finite and >= 1"));
        }
        if !(self.population_cap.is_finite() && self.population_cap > self.population_floor) {
            return Err(FitError::invalid_config(
                "population_cap",
                format!("must be finite and > population_floor ({})", self.population_floor),
            ));
        }
        if self.max_iterations == 0 {
            return Err(FitError::invalid_config("max_iterations", "must be > 0"));
        }
        if self.day_limit == Some(0) {
            return Err(FitError::invalid_config("day_limit", "must be > 0 when set"));
        }
        if self.forecast_points < 2 {
            return Err(FitError::invalid_config("forecast_points", "must be >= 2"));
        }
        if !(self.grad_tolerance.is_finite() && self.grad_tolerance >= 0.0) {
            return Err(FitError::invalid_config("grad_tolerance", "must be finite and >= 0"));
        }
        if !(self.cost_tolerance.is_finite() && self.cost_tolerance >= 0.0) {
            return Err(FitError::invalid_config("cost_tolerance", "must be finite and >= 0"));
        }
        if self.lbfgs_memory == 0 {
            return Err(FitError::invalid_config("lbfgs_memory", "must be > 0"));
        }
        if let Some(pairs) = &self.weight_pairs {
            if pairs.is_empty() {
                return Err(FitError::invalid_config("weight_pairs", "must not be empty when set"));
            }
            for pair in pairs {
                pair.validate()?;
            }
        }
        self.ode_options()
            .validate()
            .map_err(|e| FitError::invalid_config("ode", e.to_string()))?;
        Ok(())
    }

    /// Weight configurations to try, in declaration order.
    pub fn resolved_weight_pairs(&self) -> Vec<WeightPair> {
        self.weight_pairs.clone().unwrap_or_else(WeightPair::defaults)
    }

    pub fn ode_options(&self) -> OdeOptions {
        OdeOptions {
            rtol: self.ode_rtol,
            atol: self.ode_atol,
            max_steps: self.ode_max_steps,
            ..OdeOptions::default()
        }
    }
}

/// A day index relative to the (trim-adjusted) reference date, plus its date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub day: i64,
    pub date: NaiveDate,
}

/// Outcome of one weight configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRun {
    pub weights: WeightPair,
    pub converged: bool,
    /// Best objective value found (infinite when the run errored).
    pub cost: f64,
    pub parameters: Option<EpidemicParameters>,
    pub iterations: u64,
    pub status: String,
}

/// Goodness-of-fit statistics over the observed horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub r_squared: f64,
    pub rmse: f64,
    pub n: usize,
}

/// Terminal artifact of a successful fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub label: String,
    /// Reference date after trimming the flat start (day 0 of every series below).
    pub start_date: NaiveDate,
    /// Number of leading flat days dropped.
    pub trimmed_days: usize,
    pub parameters: EpidemicParameters,
    pub r0: f64,
    pub seed: LogisticSeed,
    pub initial_parameters: EpidemicParameters,
    /// Observed (trimmed) cumulative series.
    pub observed: Vec<f64>,
    /// Model on the observed day grid.
    pub fitted: Vec<f64>,
    /// Extended forecast grid times (days since `start_date`).
    pub forecast_times: Vec<f64>,
    pub forecast: Vec<f64>,
    /// Model value one day past the last observation.
    pub next_day_forecast: f64,
    pub quality: FitQuality,
    pub daily_observed: Vec<f64>,
    pub daily_fitted: Vec<f64>,
    /// Daily rate of the extended forecast, one value per forecast grid interval.
    pub daily_forecast: Vec<f64>,
    pub peak: Milestone,
    pub decline: Milestone,
    pub weights: WeightPair,
    pub objective: f64,
    /// Every attempted weight configuration, in declaration order.
    pub runs: Vec<WeightRun>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_maps_to_fixed_parameter_relations() {
        let seed = LogisticSeed {
            k: 1000.0,
            r: 0.2,
            a: 9.0,
            indices: (0, 5, 10),
        };
        let p = seed.to_parameters();
        assert_eq!(p.initial_infected, 100.0);
        assert_eq!(p.population, 2000.0);
        assert!((p.gamma - 0.4).abs() < 1e-12);
        assert!((p.beta - 0.6).abs() < 1e-12);
        assert!((p.r0() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn weight_pair_normalizes_and_validates() {
        let (c1, c2) = WeightPair::new(3.0, 1.0).unwrap().normalized();
        assert!((c1 - 0.75).abs() < 1e-12);
        assert!((c2 - 0.25).abs() < 1e-12);
        assert!(WeightPair::new(0.0, 0.0).is_err());
        assert!(WeightPair::new(-1.0, 2.0).is_err());
        assert!(WeightPair::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn default_config_is_valid_and_uses_three_weightings() {
        let config = FitConfig::default();
        config.validate().unwrap();
        assert_eq!(config.resolved_weight_pairs(), WeightPair::defaults());
    }

    #[test]
    fn config_rejects_cap_below_floor() {
        let config = FitConfig {
            population_cap: 500.0,
            ..FitConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, FitError::InvalidConfig { field: "population_cap", .. }));
    }

    #[test]
    fn config_rejects_empty_weight_list() {
        let config = FitConfig {
            weight_pairs: Some(Vec::new()),
            ..FitConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn daily_is_first_difference() {
        let s = CaseSeries::new("x", vec![1.0, 3.0, 6.0]);
        assert_eq!(s.daily(), vec![2.0, 3.0]);
    }
}
