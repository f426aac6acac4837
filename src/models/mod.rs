//! Epidemic model right-hand sides.
//!
//! - `reduced_sir`: the scalar cumulative-case model used for fitting
//! - `compartmental`: SIR/SEIR/SEIAR/SEIARD families for scenario simulation

pub mod compartmental;
pub mod reduced_sir;

pub use compartmental::*;
pub use reduced_sir::*;
