//! `selfgrav-fit` library crate.
//!
//! The binary (`sgfit`) is a thin wrapper around this library so that:
//!
//! - the rotation-curve kernel and inference engine are testable without spawning processes
//! - external forward models can plug into the engine through `models::ForwardModel`
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod io;
pub mod math;
pub mod models;
pub mod physics;
pub mod plot;
pub mod priors;
pub mod report;
