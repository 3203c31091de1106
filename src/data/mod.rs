//! Dataset payloads and the per-dataset inference context.
//!
//! - `inference`: [`InferenceData`] and its bookkeeping
//! - `profile`: measured rotation curves
//! - `visibility`: interferometric visibilities with channel bookkeeping

pub mod inference;
pub mod profile;
pub mod visibility;

pub use inference::*;
pub use profile::*;
pub use visibility::*;
