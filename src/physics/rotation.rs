//! Non-Keplerian rotation curve of a self-gravitating, pressure-supported disk.
//!
//! The squared angular velocity at the emission surface is the sum of three terms:
//!
//! ```text
//! Ω² = Ω_K² + ε_P + ε_g
//! ```
//!
//! - `Ω_K²`: stellar Keplerian term at the spherical radius of the emission surface
//! - `ε_P`: pressure support from the hydrostatic density and temperature structure,
//!   solved on a 2-D (r′, z′) mesh and interpolated onto the emission surface
//! - `ε_g`: radial field of the disk's own mass, from an elliptic-integral kernel
//!   integrated over a logarithmic source-radius grid
//!
//! Everything that does not depend on the stellar or disk mass (mesh, temperature,
//! sound speed and its derivatives, surface-density shapes) is computed once in
//! [`RotationCurveSolver::new`]. A solver is immutable and can be shared across
//! threads.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::math::{cumtrapz, ellipke, forward_diff, gradient, interp_linear, interp_linear_many};
use crate::math::{linspace, logspace, trapz};
use crate::physics::constants::{AU, G, M_SUN};
use crate::physics::disk::DiskStructure;

use std::f64::consts::PI;

/// Mesh and source-grid extents (AU, or base-10 exponents of AU).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverGrid {
    pub r_min: f64,
    pub r_max: f64,
    pub nr: usize,
    pub z_min_exp: f64,
    pub z_max_exp: f64,
    pub nz: usize,
    pub source_min_exp: f64,
    pub source_max_exp: f64,
    pub n_source: usize,
}

impl Default for SolverGrid {
    fn default() -> Self {
        Self {
            r_min: 0.5,
            r_max: 300.5,
            nr: 301,
            z_min_exp: -1.5,
            z_max_exp: 2.0,
            nz: 201,
            source_min_exp: 0.0,
            source_max_exp: 3.0,
            n_source: 512,
        }
    }
}

/// Free parameters of the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationParams {
    /// Stellar mass [Msun].
    pub stellar_mass: f64,
    /// Disk (gas) mass [Msun].
    pub disk_mass: f64,
    /// Natural log of the fractional model scatter; only likelihoods use it.
    pub ln_scatter: Option<f64>,
}

impl RotationParams {
    pub fn new(stellar_mass: f64, disk_mass: f64) -> Self {
        Self {
            stellar_mass,
            disk_mass,
            ln_scatter: None,
        }
    }

    /// Read `[Mstar, Mdisk]` or `[Mstar, Mdisk, ln f]`.
    pub fn from_slice(pars: &[f64]) -> Option<Self> {
        match *pars {
            [stellar_mass, disk_mass] => Some(Self::new(stellar_mass, disk_mass)),
            [stellar_mass, disk_mass, ln_f] => Some(Self {
                stellar_mass,
                disk_mass,
                ln_scatter: Some(ln_f),
            }),
            _ => None,
        }
    }
}

/// Per-radius contributions to the squared angular velocity [s^-2].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationComponents {
    pub keplerian: Vec<f64>,
    pub pressure: Vec<f64>,
    pub self_gravity: Vec<f64>,
    /// Sum of the three terms after the physical validity clamp.
    pub omega_sq: Vec<f64>,
}

/// Azimuthal velocity profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationField {
    pub radius_au: Vec<f64>,
    /// Azimuthal velocity [m/s].
    pub velocity: Vec<f64>,
    pub components: RotationComponents,
}

/// Physical validity clamp for the squared angular velocity.
///
/// Unphysical (negative) sums are truncated to zero rather than rejected, so the
/// resulting velocity is always real and non-negative.
pub fn clamp_angular_velocity_sq(omega_sq: f64) -> f64 {
    omega_sq.max(0.0)
}

/// Precomputed rotation-curve kernel.
#[derive(Debug, Clone)]
pub struct RotationCurveSolver {
    disk: DiskStructure,

    r_grid: Vec<f64>,
    z_grid: Vec<f64>,
    r_grid_m: Vec<f64>,
    z_grid_m: Vec<f64>,
    /// Emission-surface height on `r_grid` [AU].
    surface_on_grid: Vec<f64>,

    /// Sound speed on the (z′, r′) mesh [m/s]; rows are heights, columns radii.
    sound_speed: DMatrix<f64>,
    /// Vertical gradient of `ln c` [m^-1].
    dlnc_dz: DMatrix<f64>,
    /// Radial gradient of `c` [s^-1].
    dc_dr: DMatrix<f64>,

    /// Surface-density shape on `r_grid` and its `∫ 2π Σ r dr` [m^2].
    sigma_shape: Vec<f64>,
    sigma_norm: f64,

    source_grid: Vec<f64>,
    source_grid_m: Vec<f64>,
    source_sigma_shape: Vec<f64>,
    source_sigma_norm: f64,
}

impl Default for RotationCurveSolver {
    fn default() -> Self {
        Self::new(DiskStructure::default(), &SolverGrid::default())
    }
}

impl RotationCurveSolver {
    pub fn new(disk: DiskStructure, grid: &SolverGrid) -> Self {
        let r_grid = linspace(grid.r_min, grid.r_max, grid.nr);
        let z_grid = logspace(grid.z_min_exp, grid.z_max_exp, grid.nz);
        let r_grid_m: Vec<f64> = r_grid.iter().map(|r| r * AU).collect();
        let z_grid_m: Vec<f64> = z_grid.iter().map(|z| z * AU).collect();
        let (nz, nr) = (z_grid.len(), r_grid.len());

        let surface_on_grid = r_grid.iter().map(|&r| disk.emission_surface(r)).collect();

        let sound_speed = DMatrix::from_fn(nz, nr, |i, j| {
            disk.sound_speed(disk.temperature(r_grid[j], z_grid[i]))
        });

        let mut dlnc_dz = DMatrix::zeros(nz, nr);
        for j in 0..nr {
            let ln_c: Vec<f64> = sound_speed.column(j).iter().map(|c| c.ln()).collect();
            let d = forward_diff(&ln_c, &z_grid_m);
            dlnc_dz.column_mut(j).copy_from_slice(&d);
        }

        let mut dc_dr = DMatrix::zeros(nz, nr);
        for i in 0..nz {
            let row: Vec<f64> = sound_speed.row(i).iter().copied().collect();
            for (j, g) in gradient(&row, &r_grid_m).into_iter().enumerate() {
                dc_dr[(i, j)] = g;
            }
        }

        let sigma_shape: Vec<f64> = r_grid.iter().map(|&r| disk.surface_density_shape(r)).collect();
        let sigma_norm = annulus_mass_integral(&sigma_shape, &r_grid_m);

        let source_grid = logspace(grid.source_min_exp, grid.source_max_exp, grid.n_source);
        let source_grid_m: Vec<f64> = source_grid.iter().map(|r| r * AU).collect();
        let source_sigma_shape: Vec<f64> = source_grid
            .iter()
            .map(|&r| disk.surface_density_shape(r))
            .collect();
        let source_sigma_norm = annulus_mass_integral(&source_sigma_shape, &source_grid_m);

        Self {
            disk,
            r_grid,
            z_grid,
            r_grid_m,
            z_grid_m,
            surface_on_grid,
            sound_speed,
            dlnc_dz,
            dc_dr,
            sigma_shape,
            sigma_norm,
            source_grid,
            source_grid_m,
            source_sigma_shape,
            source_sigma_norm,
        }
    }

    pub fn disk(&self) -> &DiskStructure {
        &self.disk
    }

    /// Radial extent of the pressure mesh [AU].
    pub fn mesh_range(&self) -> (f64, f64) {
        let lo = self.r_grid.first().copied().unwrap_or(0.0);
        let hi = self.r_grid.last().copied().unwrap_or(0.0);
        (lo, hi)
    }

    /// Azimuthal velocity at each radius in `radius_au`.
    pub fn solve(&self, radius_au: &[f64], params: &RotationParams) -> RotationField {
        let surface: Vec<f64> = radius_au
            .iter()
            .map(|&r| self.disk.emission_surface(r))
            .collect();

        let keplerian: Vec<f64> = radius_au
            .iter()
            .zip(&surface)
            .map(|(&r, &z)| keplerian_term(params.stellar_mass, r * AU, z * AU))
            .collect();

        let pressure = self.pressure_support(radius_au, params);

        let self_gravity: Vec<f64> = radius_au
            .iter()
            .zip(&surface)
            .map(|(&r, &z)| self.self_gravity_term(r, z, params.disk_mass))
            .collect();

        let omega_sq: Vec<f64> = (0..radius_au.len())
            .map(|i| clamp_angular_velocity_sq(keplerian[i] + pressure[i] + self_gravity[i]))
            .collect();

        let velocity = radius_au
            .iter()
            .zip(&omega_sq)
            .map(|(&r, &w2)| r * AU * w2.sqrt())
            .collect();

        RotationField {
            radius_au: radius_au.to_vec(),
            velocity,
            components: RotationComponents {
                keplerian,
                pressure,
                self_gravity,
                omega_sq,
            },
        }
    }

    /// Pressure-support term on the full (z′, r′) mesh [s^-2].
    pub fn pressure_support_grid(&self, params: &RotationParams) -> DMatrix<f64> {
        let (nz, nr) = self.sound_speed.shape();
        let gm_star = G * params.stellar_mass * M_SUN;
        let sigma_scale = surface_density_scale(params.disk_mass, self.sigma_norm);

        // Hydrostatic balance, one vertical column per radius.
        let mut ln_rho = DMatrix::zeros(nz, nr);
        for j in 0..nr {
            let r = self.r_grid_m[j];
            let sigma = sigma_scale * self.sigma_shape[j];
            let gz_disk = 2.0 * PI * G * sigma;

            let dlnp_dz: Vec<f64> = (0..nz)
                .map(|i| {
                    let z = self.z_grid_m[i];
                    let c = self.sound_speed[(i, j)];
                    let gz_star = z * gm_star / r.hypot(z).powi(3);
                    -(gz_star + gz_disk) / (c * c) - 2.0 * self.dlnc_dz[(i, j)]
                })
                .collect();

            let rho0: Vec<f64> = cumtrapz(&dlnp_dz, &self.z_grid_m)
                .into_iter()
                .map(f64::exp)
                .collect();
            let column_norm = trapz(&rho0, &self.z_grid_m);

            for (i, &p) in rho0.iter().enumerate() {
                let rho = self.disk.clamp_density(0.5 * p * sigma / column_norm);
                ln_rho[(i, j)] = rho.ln();
            }
        }

        let mut eps = DMatrix::zeros(nz, nr);
        for i in 0..nz {
            let row: Vec<f64> = ln_rho.row(i).iter().copied().collect();
            let dlnrho_dr = gradient(&row, &self.r_grid_m);
            for j in 0..nr {
                let r = self.r_grid_m[j];
                let c = self.sound_speed[(i, j)];
                eps[(i, j)] = c * c * dlnrho_dr[j] / r + 2.0 * c * self.dc_dr[(i, j)] / r;
            }
        }
        eps
    }

    /// Pressure support interpolated onto the emission surface, then onto `radius_au`.
    fn pressure_support(&self, radius_au: &[f64], params: &RotationParams) -> Vec<f64> {
        let eps_grid = self.pressure_support_grid(params);

        let on_surface: Vec<f64> = (0..self.r_grid.len())
            .map(|j| {
                let column: Vec<f64> = eps_grid.column(j).iter().copied().collect();
                interp_linear(&self.z_grid, &column, self.surface_on_grid[j])
            })
            .collect();

        interp_linear_many(&self.r_grid, &on_surface, radius_au)
    }

    /// Disk self-gravity contribution at radius `r` and height `z` (AU) [s^-2].
    fn self_gravity_term(&self, r: f64, z: f64, disk_mass: f64) -> f64 {
        let sigma_scale = surface_density_scale(disk_mass, self.source_sigma_norm);
        if sigma_scale == 0.0 {
            return 0.0;
        }

        let integrand: Vec<f64> = self
            .source_grid
            .iter()
            .zip(&self.source_sigma_shape)
            .map(|(&rs, &shape)| {
                let k = (4.0 * rs * r / ((r + rs).powi(2) + z * z)).sqrt();
                // The modulus goes into the parameter slot of K and E.
                let (ek, ee) = ellipke(k);
                let xi = ek
                    - 0.25 * (k * k / (1.0 - k * k)) * ((rs / r) - (r / rs) + (z * z / (r * rs))) * ee;
                xi * (rs / r).sqrt() * k * sigma_scale * shape
            })
            .collect();

        let r_m = r * AU;
        let dphi_dr = G * trapz(&integrand, &self.source_grid_m) / r_m;
        dphi_dr / r_m
    }
}

/// Stellar Keplerian term `G M / d^3` at spherical distance `hypot(r, z)` (metres).
fn keplerian_term(stellar_mass: f64, r: f64, z: f64) -> f64 {
    G * stellar_mass * M_SUN / r.hypot(z).powi(3)
}

/// `∫ 2π shape(r) r dr` over a grid in metres.
fn annulus_mass_integral(shape: &[f64], r_m: &[f64]) -> f64 {
    let integrand: Vec<f64> = shape
        .iter()
        .zip(r_m)
        .map(|(&s, &r)| 2.0 * PI * s * r)
        .collect();
    trapz(&integrand, r_m)
}

/// Normalisation turning a surface-density shape into kg m^-2 for the given disk mass.
fn surface_density_scale(disk_mass: f64, norm: f64) -> f64 {
    disk_mass * M_SUN / norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn solver() -> &'static RotationCurveSolver {
        static SOLVER: OnceLock<RotationCurveSolver> = OnceLock::new();
        SOLVER.get_or_init(RotationCurveSolver::default)
    }

    fn radii() -> Vec<f64> {
        linspace(10.0, 250.0, 25)
    }

    #[test]
    fn self_gravity_vanishes_without_disk_mass() {
        let field = solver().solve(&radii(), &RotationParams::new(0.5, 0.0));
        assert!(field.components.self_gravity.iter().all(|&g| g == 0.0));
        for i in 0..field.radius_au.len() {
            let c = &field.components;
            let expected = clamp_angular_velocity_sq(c.keplerian[i] + c.pressure[i]);
            assert!((c.omega_sq[i] - expected).abs() <= 1e-12 * expected.abs().max(1e-30));
        }
    }

    #[test]
    fn massless_star_never_yields_imaginary_velocity() {
        let field = solver().solve(&radii(), &RotationParams::new(0.0, 0.05));
        assert!(field.components.keplerian.iter().all(|&k| k == 0.0));
        for v in &field.velocity {
            assert!(v.is_finite() && *v >= 0.0, "velocity {v}");
        }
    }

    #[test]
    fn keplerian_term_grows_with_stellar_mass() {
        let r = radii();
        let light = solver().solve(&r, &RotationParams::new(0.3, 0.01));
        let heavy = solver().solve(&r, &RotationParams::new(0.6, 0.01));
        for (a, b) in light.components.keplerian.iter().zip(&heavy.components.keplerian) {
            assert!(b > a);
        }
    }

    #[test]
    fn thin_disk_rotates_slightly_sub_keplerian() {
        let field = solver().solve(&radii(), &RotationParams::new(0.5, 0.0));
        for (i, &r) in field.radius_au.iter().enumerate() {
            let v_kep = r * AU * field.components.keplerian[i].sqrt();
            let v = field.velocity[i];
            assert!(v <= v_kep * (1.0 + 1e-9), "r={r}: v={v} above v_kep={v_kep}");
            assert!(v >= 0.8 * v_kep, "r={r}: v={v} far below v_kep={v_kep}");
        }
    }

    #[test]
    fn disk_mass_adds_finite_self_gravity() {
        let field = solver().solve(&radii(), &RotationParams::new(0.5, 0.1));
        assert!(field.components.self_gravity.iter().all(|g| g.is_finite()));
        assert!(field.components.self_gravity.iter().any(|&g| g != 0.0));
    }

    #[test]
    fn solve_is_deterministic() {
        let params = RotationParams::new(0.45, 0.03);
        let a = solver().solve(&radii(), &params);
        let b = solver().solve(&radii(), &params);
        assert_eq!(a, b);
    }

    #[test]
    fn clamp_truncates_negative_sums() {
        assert_eq!(clamp_angular_velocity_sq(-3.0), 0.0);
        assert_eq!(clamp_angular_velocity_sq(2.5), 2.5);
    }

    #[test]
    fn params_from_slice() {
        assert_eq!(RotationParams::from_slice(&[0.5, 0.1]), Some(RotationParams::new(0.5, 0.1)));
        let p = RotationParams::from_slice(&[0.5, 0.1, -2.0]).unwrap();
        assert_eq!(p.ln_scatter, Some(-2.0));
        assert!(RotationParams::from_slice(&[0.5]).is_none());
    }

    #[test]
    fn pressure_grid_has_mesh_shape() {
        let eps = solver().pressure_support_grid(&RotationParams::new(0.5, 0.05));
        assert_eq!(eps.shape(), (201, 301));
        assert!(eps.iter().all(|v| v.is_finite()));
    }
}
