//! `FitConfig` loading.
//!
//! Precedence, lowest first: built-in defaults, the TOML file passed with
//! `--config`, then individual CLI flags.

use std::path::Path;

use crate::domain::{FitConfig, WeightPair};
use crate::error::AppError;

/// Per-field overrides collected from the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub population_cap: Option<f64>,
    pub day_limit: Option<usize>,
    pub weight_pairs: Vec<WeightPair>,
    pub max_iterations: Option<u64>,
    pub forecast_horizon_days: Option<usize>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut FitConfig) {
        if let Some(cap) = self.population_cap {
            config.population_cap = cap;
        }
        if let Some(limit) = self.day_limit {
            config.day_limit = Some(limit);
        }
        if !self.weight_pairs.is_empty() {
            config.weight_pairs = Some(self.weight_pairs.clone());
        }
        if let Some(iters) = self.max_iterations {
            config.max_iterations = iters;
        }
        if let Some(days) = self.forecast_horizon_days {
            config.forecast_horizon_days = days;
        }
    }
}

/// Parse a TOML document into a config; missing keys keep their defaults.
pub fn parse_config(text: &str) -> Result<FitConfig, AppError> {
    toml::from_str(text).map_err(|e| AppError::new(2, format!("Failed to parse TOML config: {e}")))
}

/// Load `path` (if any), apply `overrides` and validate the result.
pub fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<FitConfig, AppError> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                AppError::new(2, format!("Failed to read config '{}': {e}", path.display()))
            })?;
            parse_config(&text)?
        }
        None => FitConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Parse a `w1,w2` weight pair from the command line.
pub fn parse_weight_pair(text: &str) -> Result<WeightPair, String> {
    let (w1, w2) = text
        .split_once(',')
        .ok_or_else(|| format!("expected `w1,w2`, got `{text}`"))?;
    let w1: f64 = w1.trim().parse().map_err(|e| format!("invalid w1 `{w1}`: {e}"))?;
    let w2: f64 = w2.trim().parse().map_err(|e| format!("invalid w2 `{w2}`: {e}"))?;
    WeightPair::new(w1, w2).map_err(|e| e.to_string())
}
