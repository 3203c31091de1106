//! Measured rotation-curve payload.

use serde::{Deserialize, Serialize};

/// A rotation curve sampled at increasing radii.
///
/// Velocities and uncertainties are in m/s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationCurveData {
    pub radius_au: Vec<f64>,
    pub velocity: Vec<f64>,
    pub sigma: Vec<f64>,
}

impl RotationCurveData {
    pub fn len(&self) -> usize {
        self.radius_au.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radius_au.is_empty()
    }

    /// Radial extent `(min, max)` in AU, if any points exist.
    pub fn radial_range(&self) -> Option<(f64, f64)> {
        let first = *self.radius_au.first()?;
        let last = *self.radius_au.last()?;
        Some((first, last))
    }
}
