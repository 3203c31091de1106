//! Numerical building blocks for the rotation-curve kernel.
//!
//! Everything here mirrors the small subset of numpy/scipy behaviour the kernel
//! needs: evenly spaced grids, trapezoidal quadrature, gradients, linear
//! interpolation and complete elliptic integrals.

pub mod elliptic;
pub mod interp;
pub mod quad;
pub mod spacing;

pub use elliptic::*;
pub use interp::*;
pub use quad::*;
pub use spacing::*;
