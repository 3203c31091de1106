//! Built-in forward model: a measured rotation curve against the self-gravitating
//! disk kernel.
//!
//! The likelihood is Gaussian with an optional fractional scatter term:
//!
//! ```text
//! s² = σ² + v_model² · exp(2 ln f)
//! ln L = -½ Σ [ (v - v_model)² / s² + ln s² ]
//! ```

use std::path::{Path, PathBuf};

use crate::data::{ContextMeta, FitDataOptions, InferenceData, RotationCurveData};
use crate::domain::{FixedConfig, GridParam, SamplerSettings};
use crate::error::AppError;
use crate::io::load_rotation_curve;
use crate::models::forward::ForwardModel;
use crate::physics::{RotationCurveSolver, RotationParams};
use crate::priors::PriorSpec;

/// Parameters the rotation-curve likelihood understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveParam {
    StellarMass,
    DiskMass,
    LnScatter,
}

impl CurveParam {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "stellar_mass" => Some(CurveParam::StellarMass),
            "disk_mass" => Some(CurveParam::DiskMass),
            "ln_f" => Some(CurveParam::LnScatter),
            _ => None,
        }
    }

    fn assign(self, params: &mut RotationParams, value: f64) {
        match self {
            CurveParam::StellarMass => params.stellar_mass = value,
            CurveParam::DiskMass => params.disk_mass = value,
            CurveParam::LnScatter => params.ln_scatter = Some(value),
        }
    }
}

/// Rotation-curve forward model.
#[derive(Debug, Clone)]
pub struct RotationCurveModel {
    solver: RotationCurveSolver,
    /// Values used for parameters not present in `theta`.
    fiducial: RotationParams,
    /// Meaning of each `theta` entry.
    layout: Vec<CurveParam>,
}

impl Default for RotationCurveModel {
    fn default() -> Self {
        Self::new(RotationCurveSolver::default())
    }
}

impl RotationCurveModel {
    /// Model with `theta = [stellar_mass, disk_mass, ln_f]`.
    pub fn new(solver: RotationCurveSolver) -> Self {
        Self {
            solver,
            fiducial: RotationParams::new(0.5, 0.0),
            layout: vec![CurveParam::StellarMass, CurveParam::DiskMass, CurveParam::LnScatter],
        }
    }

    pub fn with_fiducial(mut self, fiducial: RotationParams) -> Self {
        self.fiducial = fiducial;
        self
    }

    /// Lay `theta` out according to the parameter names of `prior`.
    pub fn with_layout_from(mut self, prior: &PriorSpec) -> Result<Self, AppError> {
        self.layout = prior
            .param_names()
            .map(|name| {
                CurveParam::from_name(name).ok_or_else(|| {
                    AppError::config(format!(
                        "Prior set '{}' has parameter `{name}`, which the rotation-curve model does not use.",
                        prior.name
                    ))
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    pub fn solver(&self) -> &RotationCurveSolver {
        &self.solver
    }

    pub fn fiducial(&self) -> RotationParams {
        self.fiducial
    }

    /// Kernel parameters for a `theta` vector, or `None` if its length does not fit.
    pub fn params_for(&self, theta: &[f64], param: Option<GridParam>) -> Option<RotationParams> {
        let mut params = self.fiducial;
        match param {
            Some(GridParam::StellarMass) => params.stellar_mass = *theta.first()?,
            Some(other) => {
                log::debug!("Parameter `{other}` does not enter the rotation curve; likelihood is flat");
            }
            None => {
                if theta.len() != self.layout.len() {
                    return None;
                }
                for (p, &value) in self.layout.iter().zip(theta) {
                    p.assign(&mut params, value);
                }
            }
        }
        Some(params)
    }

    /// Gaussian log-likelihood of a curve given kernel parameters.
    pub fn curve_log_likelihood(&self, curve: &RotationCurveData, params: &RotationParams) -> f64 {
        let field = self.solver.solve(&curve.radius_au, params);
        let f2 = params.ln_scatter.map(|ln_f| (2.0 * ln_f).exp()).unwrap_or(0.0);

        let mut sum = 0.0;
        for ((&v_obs, &sigma), &v_model) in curve.velocity.iter().zip(&curve.sigma).zip(&field.velocity) {
            let s2 = sigma * sigma + v_model * v_model * f2;
            let resid = v_obs - v_model;
            sum += resid * resid / s2 + s2.ln();
        }
        let ll = -0.5 * sum;
        if ll.is_nan() { f64::NEG_INFINITY } else { ll }
    }
}

impl ForwardModel for RotationCurveModel {
    type Data = RotationCurveData;

    fn fitdata(&self, dataset: &Path, opts: &FitDataOptions) -> Result<InferenceData<RotationCurveData>, AppError> {
        let ingested = load_rotation_curve(dataset)?;
        for err in &ingested.row_errors {
            log::warn!("{}:{}: {}", dataset.display(), err.line, err.message);
        }
        log::info!(
            "Loaded {} of {} rows from '{}'",
            ingested.rows_used(),
            ingested.rows_read,
            dataset.display()
        );
        // One curve is one independent observation.
        Ok(InferenceData::new(ContextMeta::new(opts, 1), ingested.curve))
    }

    fn cache(
        &self,
        walkers: &[Vec<f64>],
        mut data: InferenceData<RotationCurveData>,
        restfreq: f64,
        cfg: &FixedConfig,
    ) -> Result<InferenceData<RotationCurveData>, AppError> {
        if data.payload.is_empty() {
            return Err(AppError::model("Cannot cache an empty rotation curve."));
        }
        if let Some((r_lo, r_hi)) = data.payload.radial_range() {
            let (mesh_lo, mesh_hi) = self.solver.mesh_range();
            if r_lo < mesh_lo || r_hi > mesh_hi {
                log::warn!(
                    "Curve spans {r_lo:.1}..{r_hi:.1} AU but the pressure mesh covers {mesh_lo:.1}..{mesh_hi:.1} AU; \
                     pressure support will be extrapolated"
                );
            }
        }
        log::debug!("Caching rotation curve context for {} walkers", walkers.len());

        data.meta.restfreq = restfreq;
        data.meta.chpad = cfg.chpad;
        data.meta.nup = cfg.nup;
        data.meta.cached = true;
        Ok(data)
    }

    fn log_likelihood(
        &self,
        theta: &[f64],
        ctx: &InferenceData<RotationCurveData>,
        _cfg: &FixedConfig,
        param: Option<GridParam>,
    ) -> f64 {
        match self.params_for(theta, param) {
            Some(params) => self.curve_log_likelihood(&ctx.payload, &params),
            None => f64::NEG_INFINITY,
        }
    }

    fn sample_posteriors(
        &self,
        dataset: &Path,
        _cfg: &FixedConfig,
        _sampler: &SamplerSettings,
    ) -> Result<PathBuf, AppError> {
        Err(AppError::unsupported(format!(
            "The rotation-curve model has no posterior sampler; cannot sample '{}'.",
            dataset.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priors::PriorCatalog;
    use std::sync::OnceLock;

    fn model() -> &'static RotationCurveModel {
        static MODEL: OnceLock<RotationCurveModel> = OnceLock::new();
        MODEL.get_or_init(RotationCurveModel::default)
    }

    fn synthetic_curve(params: &RotationParams) -> RotationCurveData {
        let radius_au = vec![20.0, 50.0, 100.0, 150.0, 200.0];
        let field = model().solver().solve(&radius_au, params);
        RotationCurveData {
            sigma: vec![50.0; radius_au.len()],
            velocity: field.velocity,
            radius_au,
        }
    }

    #[test]
    fn truth_beats_neighbours() {
        let truth = RotationParams::new(0.6, 0.0);
        let curve = synthetic_curve(&truth);
        let m = model();
        let at_truth = m.curve_log_likelihood(&curve, &truth);
        let below = m.curve_log_likelihood(&curve, &RotationParams::new(0.5, 0.0));
        let above = m.curve_log_likelihood(&curve, &RotationParams::new(0.7, 0.0));
        assert!(at_truth > below && at_truth > above);
    }

    #[test]
    fn scatter_term_widens_the_likelihood() {
        let curve = synthetic_curve(&RotationParams::new(0.6, 0.0));
        let m = model();
        let off = RotationParams::new(0.3, 0.0);
        let mut off_scatter = off;
        off_scatter.ln_scatter = Some(-1.0);
        assert!(m.curve_log_likelihood(&curve, &off_scatter) > m.curve_log_likelihood(&curve, &off));
    }

    #[test]
    fn grid_params_override_only_stellar_mass() {
        let m = model();
        let p = m.params_for(&[0.42], Some(GridParam::StellarMass)).unwrap();
        assert_eq!(p.stellar_mass, 0.42);
        assert_eq!(p.disk_mass, m.fiducial().disk_mass);

        let flat = m.params_for(&[123.0], Some(GridParam::Pa)).unwrap();
        assert_eq!(flat, m.fiducial());
    }

    #[test]
    fn theta_layout_follows_prior() {
        let catalog = PriorCatalog::with_defaults();
        let single = RotationCurveModel::default()
            .with_layout_from(&catalog.resolve("VEXACT_disk_mass").unwrap())
            .unwrap();
        let p = single.params_for(&[0.05], None).unwrap();
        assert_eq!(p.disk_mass, 0.05);
        assert!(single.params_for(&[0.05, 0.1], None).is_none());

        let err = RotationCurveModel::default()
            .with_layout_from(&catalog.resolve("MCFOST").unwrap())
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn sampler_is_unsupported() {
        let err = model()
            .sample_posteriors(
                Path::new("curve.csv"),
                &FixedConfig::defaults(1.0),
                &SamplerSettings::default(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Unsupported);
    }
}
