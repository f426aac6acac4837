//! Command-line parsing for the epidemic curve fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::config::{ConfigOverrides, parse_weight_pair};
use crate::domain::WeightPair;
use crate::io::ValueKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "epi", version, about = "SIR epidemic curve fitter")]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the SIR model to a cumulative case series and print the report.
    Fit(FitArgs),
    /// Print the three-point logistic seed for a series.
    Seed(SeedArgs),
    /// Integrate the model for given parameters and print the cumulative series.
    Simulate(SimulateArgs),
}

/// Where the case series comes from.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Series file: one value per line, or `date,value` rows.
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Whether the file holds running totals or new cases per day.
    #[arg(long, value_enum, default_value_t = ValueKind::Cumulative)]
    pub values: ValueKind,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Date of the first value (required unless the file carries dates).
    #[arg(short, long, value_name = "YYYY-MM-DD")]
    pub start: Option<NaiveDate>,

    /// Label carried through to the report.
    #[arg(short, long, default_value = "")]
    pub label: String,

    /// TOML file with `FitConfig` fields.
    #[arg(short, long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Upper bound for the population size N.
    #[arg(long)]
    pub population_cap: Option<f64>,

    /// Only use the first N days of the series.
    #[arg(long)]
    pub day_limit: Option<usize>,

    /// Weight pair `w1,w2` to try (repeatable; replaces the default three).
    #[arg(long = "weights", value_name = "W1,W2", value_parser = parse_weight_pair)]
    pub weights: Vec<WeightPair>,

    /// Iteration cap per optimization run.
    #[arg(long)]
    pub max_iterations: Option<u64>,

    /// Days to forecast past the last observation.
    #[arg(long)]
    pub horizon: Option<usize>,

    /// Export the full result to JSON.
    #[arg(long, value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Export the per-day trajectory to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_csv: Option<PathBuf>,
}

impl FitArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            population_cap: self.population_cap,
            day_limit: self.day_limit,
            weight_pairs: self.weights.clone(),
            max_iterations: self.max_iterations,
            forecast_horizon_days: self.horizon,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct SeedArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Transmission rate.
    #[arg(long)]
    pub beta: f64,

    /// Recovery rate.
    #[arg(long)]
    pub gamma: f64,

    /// Population size N.
    #[arg(long)]
    pub population: f64,

    /// Initial infections I0.
    #[arg(long, default_value_t = 1.0)]
    pub i0: f64,

    /// Number of days to simulate.
    #[arg(long, default_value_t = 100)]
    pub days: usize,

    /// Log-normal noise on daily increments (0 disables).
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// RNG seed for the noise.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Round to whole case counts.
    #[arg(long)]
    pub round: bool,
}
