//! Inference engine.
//!
//! - `likelihood`: log-posterior = log-likelihood + `Nobs` * log-prior
//! - `grid`: brute-force scans on a fixed-size worker pool
//! - `controller`: the inference entry points

pub mod controller;
pub mod grid;
pub mod likelihood;

pub use controller::*;
pub use grid::*;
pub use likelihood::*;
