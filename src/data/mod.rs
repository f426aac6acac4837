//! Input data sources that do not come from files.
//!
//! - synthetic cumulative case series (`synthetic`)

pub mod synthetic;

pub use synthetic::*;
