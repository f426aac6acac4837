//! Epidemic curve fitting.
//!
//! Responsibilities:
//!
//! - estimate a logistic seed from three samples
//! - minimize the weighted residual objective for each weight configuration (parallel)
//! - select the best converged run and assemble the result

pub mod fitter;
pub mod objective;
pub mod optimizer;
pub mod seed;
pub mod selection;

pub use fitter::*;
pub use objective::*;
pub use optimizer::*;
pub use seed::*;
pub use selection::*;
