//! Input/output helpers.
//!
//! - case series ingest (`series`)
//! - result exports (JSON/CSV) (`export`)

pub mod export;
pub mod series;

pub use export::*;
pub use series::*;
