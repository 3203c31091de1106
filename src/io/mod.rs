//! Input/output helpers.
//!
//! - rotation-curve CSV ingest + validation (`ingest`)
//! - scan and rotation-curve exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
