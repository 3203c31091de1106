//! Fixed disk structure used by the rotation-curve kernel.
//!
//! The kernel treats these as constants: only stellar and disk mass vary between
//! evaluations. Lengths are in AU unless a name says otherwise.

use serde::{Deserialize, Serialize};

use crate::physics::constants::{K_B, M_H};

/// Upper bound on the gas temperature [K].
pub const TEMPERATURE_CEILING: f64 = 1000.0;

/// Upper bound on the gas mass density [kg m^-3].
pub const DENSITY_CEILING: f64 = 1e50;

/// Minimum gas number density kept by the density clamp [m^-3].
const NUMBER_DENSITY_FLOOR: f64 = 100.0 * 1e6;

/// Power-law-with-taper emission surface, surface density and two-layer
/// temperature structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskStructure {
    /// Source distance [pc]; the emission-surface fit is expressed in arcsec at this distance.
    pub distance_pc: f64,
    /// Emission-surface coefficients `(z0, phi, r_taper, q_taper)`.
    pub surface: [f64; 4],

    /// Surface-density reference radius.
    pub r0: f64,
    /// Surface-density exponential taper radius.
    pub rd: f64,
    /// Surface-density power-law index.
    pub sigma_index: f64,
    /// Taper steepness.
    pub taper_gamma: f64,

    /// Midplane temperature at `r0` [K].
    pub t_mid0: f64,
    /// Atmosphere temperature at `r0` [K].
    pub t_atm0: f64,
    /// Temperature power-law index.
    pub t_index: f64,
    /// Height-to-radius ratio of the midplane/atmosphere transition.
    pub transition_z: f64,
    /// Width of the transition in `z/r`.
    pub transition_width: f64,

    /// Mean molecular weight.
    pub mu: f64,
}

impl Default for DiskStructure {
    fn default() -> Self {
        Self {
            distance_pc: 150.0,
            surface: [0.297_234_54, 1.280_631_22, 2.172_277_01, 5.609_949_04],
            r0: 10.0,
            rd: 160.0,
            sigma_index: 1.0,
            taper_gamma: 2.0,
            t_mid0: 50.0,
            t_atm0: 170.0,
            t_index: 0.5,
            transition_z: 0.25,
            transition_width: 0.05,
            mu: 2.37,
        }
    }
}

impl DiskStructure {
    /// Emission-surface height `z(r)` in AU.
    pub fn emission_surface(&self, r: f64) -> f64 {
        let d = self.distance_pc;
        let [z0, phi, r_taper, q_taper] = self.surface;
        d * z0 * (r / d).powf(phi) * (-(r / (d * r_taper)).powf(q_taper)).exp()
    }

    /// Un-normalised surface-density profile at `r` (AU).
    pub fn surface_density_shape(&self, r: f64) -> f64 {
        (r / self.r0).powf(-self.sigma_index) * (-(r / self.rd).powf(self.taper_gamma)).exp()
    }

    /// Gas temperature at cylindrical radius `r` and height `z` (same length unit).
    ///
    /// Blends the midplane and atmosphere power laws with a `tanh` step in `z/r`,
    /// then applies the temperature clamp.
    pub fn temperature(&self, r: f64, z: f64) -> f64 {
        let scale = (r / self.r0).powf(-self.t_index);
        let t_mid = self.t_mid0 * scale;
        let t_atm = self.t_atm0 * scale;
        let fz = 0.5 * (((z / r) - self.transition_z) / self.transition_width).tanh() + 0.5;
        clamp_temperature(t_mid + fz * (t_atm - t_mid))
    }

    /// Isothermal sound speed [m/s] at temperature `t` [K].
    pub fn sound_speed(&self, t: f64) -> f64 {
        (K_B * t / (self.mu * M_H)).sqrt()
    }

    /// Lowest mass density kept by [`DiskStructure::clamp_density`] [kg m^-3].
    pub fn density_floor(&self) -> f64 {
        NUMBER_DENSITY_FLOOR * self.mu * M_H
    }

    /// Physical validity clamp for mass densities.
    pub fn clamp_density(&self, rho: f64) -> f64 {
        rho.clamp(self.density_floor(), DENSITY_CEILING)
    }
}

/// Physical validity clamp for gas temperatures.
pub fn clamp_temperature(t: f64) -> f64 {
    t.clamp(0.0, TEMPERATURE_CEILING)
}
