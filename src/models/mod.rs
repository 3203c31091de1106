//! Forward models.
//!
//! `forward` defines the collaborator interface the inference engine drives;
//! `rotation` is the built-in rotation-curve implementation.

pub mod forward;
pub mod rotation;

pub use forward::*;
pub use rotation::*;
