//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - inputs (`CaseSeries`, `FitConfig`, `WeightPair`)
//! - intermediate estimates (`LogisticSeed`, `EpidemicParameters`)
//! - fit outputs (`FitResult`, `Milestone`, `WeightRun`, etc.)

pub mod types;

pub use types::*;
