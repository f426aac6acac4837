//! `epi-curves` library crate.
//!
//! The binary (`epi`) is a thin wrapper around this library so that:
//!
//! - the estimation core is testable without spawning processes
//! - the core does no I/O: series come in as slices, results go out as values
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod models;
pub mod ode;
pub mod report;

pub use domain::{CaseSeries, EpidemicParameters, FitConfig, FitResult, LogisticSeed, WeightPair};
pub use error::{FitError, FitStage};
pub use fit::{estimate_seed, fit};
