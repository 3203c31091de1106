//! Disk physics: fixed structure, constants and the rotation-curve kernel.

pub mod constants;
pub mod disk;
pub mod rotation;

pub use disk::*;
pub use rotation::*;
