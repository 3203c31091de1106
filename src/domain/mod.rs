//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - model/config enums (`ModelType`, `GridParam`, `DopplerCorrection`, `SpectralResponse`)
//! - the fixed model configuration and its override merge (`FixedConfig`, `ConfigOverrides`)
//! - run settings (`FitSettings`, `SamplerSettings`)

pub mod types;

pub use types::*;
