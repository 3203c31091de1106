//! Inference controller.
//!
//! Owns the resolved configuration, the prior set and the forward model, and
//! exposes the four inference entry points:
//!
//! - [`InferenceController::initialise`]: load and cache a dataset
//! - [`InferenceController::get_probability`]: log-posterior of one parameter vector
//! - [`InferenceController::brute_force`]: 1-D scan on a worker pool, with a plot
//! - [`InferenceController::mcmc_fit`]: delegate to the model's posterior sampler
//!
//! The controller holds no per-call mutable state; every call takes the context
//! it needs explicitly.

use std::fs;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::data::{FitDataOptions, InferenceData};
use crate::domain::{FitSettings, FixedConfig, GridParam, SamplerSettings, default_chain_path};
use crate::engine::grid::{GridPresets, ScanResult, evaluate_grid};
use crate::engine::likelihood::LogLikelihoodEngine;
use crate::error::AppError;
use crate::models::ForwardModel;
use crate::plot::write_scan_pdf;
use crate::priors::{PriorCatalog, PriorSpec};

pub struct InferenceController<M: ForwardModel> {
    settings: FitSettings,
    dataset: PathBuf,
    model: M,
    prior: PriorSpec,
    config: FixedConfig,
    presets: GridPresets,
}

impl<M: ForwardModel> InferenceController<M> {
    /// Validate the dataset, resolve the prior set and merge the model config.
    pub fn new(settings: FitSettings, model: M, catalog: &PriorCatalog) -> Result<Self, AppError> {
        let dataset = checked_dataset(&settings)?;
        let prior = catalog.resolve(&settings.prior_name())?;
        Ok(Self::assemble(settings, dataset, model, prior))
    }

    /// Like [`new`](Self::new), with a prior set the caller already resolved.
    pub fn with_prior(settings: FitSettings, model: M, prior: PriorSpec) -> Result<Self, AppError> {
        let dataset = checked_dataset(&settings)?;
        Ok(Self::assemble(settings, dataset, model, prior))
    }

    fn assemble(settings: FitSettings, dataset: PathBuf, model: M, prior: PriorSpec) -> Self {
        let config = settings.fixed_config();
        log::info!(
            "Configured {} fit of '{}' with prior set '{}' ({} parameters)",
            settings.model_type,
            dataset.display(),
            prior.name,
            prior.dim()
        );
        log::debug!("Model config: {config:?}");

        Self {
            settings,
            dataset,
            model,
            prior,
            config,
            presets: GridPresets::default(),
        }
    }

    /// Replace the brute-force grid presets.
    pub fn with_presets(mut self, presets: GridPresets) -> Self {
        self.presets = presets;
        self
    }

    pub fn settings(&self) -> &FitSettings {
        &self.settings
    }

    pub fn dataset(&self) -> &Path {
        &self.dataset
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn prior(&self) -> &PriorSpec {
        &self.prior
    }

    pub fn config(&self) -> &FixedConfig {
        &self.config
    }

    pub fn presets(&self) -> &GridPresets {
        &self.presets
    }

    /// Load the dataset, draw initial walkers from the prior and cache the context.
    pub fn initialise(&self) -> Result<InferenceData<M::Data>, AppError> {
        let opts = FitDataOptions {
            vra: self.settings.vra,
            vcensor: self.settings.vcensor.clone(),
            restfreq: self.settings.nu_rest,
        };
        let data = self.model.fitdata(&self.dataset, &opts)?;
        log::info!("Dataset loaded: {} observation(s)", data.nobs());

        let mut rng = StdRng::seed_from_u64(self.settings.seed);
        let walkers = self.prior.initial_walkers(self.settings.nwalk, &mut rng);

        let ctx = self.model.cache(&walkers, data, self.settings.nu_rest, &self.config)?;
        log::info!("Inference context cached ({} initial walkers)", walkers.len());
        Ok(ctx)
    }

    /// Log-posterior of `theta`: model log-likelihood plus `Nobs`-scaled log-prior.
    pub fn get_probability(&self, ctx: &InferenceData<M::Data>, theta: &[f64]) -> Result<f64, AppError> {
        LogLikelihoodEngine::new(&self.model, &self.prior, &self.config).evaluate(theta, ctx)
    }

    /// Sweep one physical parameter over its preset grid and plot the result.
    ///
    /// Unknown parameter names are logged and skipped: no pool work, no plot,
    /// `Ok(None)`.
    pub fn brute_force(&self, ctx: &InferenceData<M::Data>, param_name: &str) -> Result<Option<ScanResult>, AppError> {
        let Some(mut scan) = self.evaluate_grid(ctx, param_name)? else {
            return Ok(None);
        };

        fs::create_dir_all(&self.settings.output_dir).map_err(|e| {
            AppError::io(format!(
                "Failed to create output directory '{}': {e}",
                self.settings.output_dir.display()
            ))
        })?;
        let plot_path = self
            .settings
            .output_dir
            .join(format!("{}lnposterior.pdf", scan.param.name()));
        write_scan_pdf(&scan, &plot_path)?;
        log::info!("Wrote {}", plot_path.display());

        scan.plot_path = Some(plot_path);
        Ok(Some(scan))
    }

    /// Same sweep as [`brute_force`](Self::brute_force), without plotting.
    pub fn evaluate_grid(&self, ctx: &InferenceData<M::Data>, param_name: &str) -> Result<Option<ScanResult>, AppError> {
        let Some((param, values)) = self.scan_grid(param_name) else {
            return Ok(None);
        };
        let ln_posteriors = evaluate_grid(&self.model, ctx, &self.config, param, &values, self.settings.nthreads)?;
        Ok(Some(ScanResult {
            param,
            values,
            ln_posteriors,
            plot_path: None,
        }))
    }

    /// Resolve a parameter name to its preset grid.
    pub fn scan_grid(&self, param_name: &str) -> Option<(GridParam, Vec<f64>)> {
        let Some(param) = GridParam::from_name(param_name) else {
            log::warn!("No brute-force grid for parameter '{param_name}'; skipping scan");
            return None;
        };
        let Some(preset) = self.presets.get(param) else {
            log::warn!("No preset configured for '{param}'; skipping scan");
            return None;
        };
        Some((param, preset.values()))
    }

    /// Run the model's posterior sampler and return the chain path it reports.
    pub fn mcmc_fit(&self) -> Result<PathBuf, AppError> {
        let sampler = self.sampler_settings();
        log::info!(
            "Sampling posteriors: {} walkers, {} threads, {} inits, {} steps -> {}",
            sampler.nwalk,
            sampler.nthreads,
            sampler.ninits,
            sampler.nsteps,
            sampler
                .outpost
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        );
        let chain = self.model.sample_posteriors(&self.dataset, &self.config, &sampler)?;
        log::info!("Posterior chain written to {}", chain.display());
        Ok(chain)
    }

    /// Sampler settings with the fitted window, rest frequency and chain path filled in.
    pub fn sampler_settings(&self) -> SamplerSettings {
        let mut sampler = self.settings.sampler.clone();
        sampler.vra = self.settings.vra;
        sampler.restfreq = self.settings.nu_rest;
        if sampler.outpost.is_none() {
            sampler.outpost = Some(default_chain_path(&self.dataset));
        }
        sampler
    }
}

fn checked_dataset(settings: &FitSettings) -> Result<PathBuf, AppError> {
    let Some(dataset) = settings.dataset.clone() else {
        log::error!("No dataset supplied; an inference run needs one");
        return Err(AppError::config("No dataset supplied."));
    };
    if !dataset.exists() {
        log::error!("Dataset '{}' does not exist", dataset.display());
        return Err(AppError::config(format!("Dataset '{}' does not exist.", dataset.display())));
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::data::ContextMeta;
    use crate::domain::{ConfigOverrides, ModelType};

    /// Records how often it is evaluated; likelihood peaks at `PA = 90`.
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl ForwardModel for Counting {
        type Data = Vec<f64>;

        fn fitdata(&self, _: &Path, opts: &FitDataOptions) -> Result<InferenceData<Vec<f64>>, AppError> {
            Ok(InferenceData::new(ContextMeta::new(opts, 2), vec![1.0, 2.0]))
        }

        fn cache(
            &self,
            walkers: &[Vec<f64>],
            mut data: InferenceData<Vec<f64>>,
            _: f64,
            _: &FixedConfig,
        ) -> Result<InferenceData<Vec<f64>>, AppError> {
            data.meta.cached = !walkers.is_empty();
            Ok(data)
        }

        fn log_likelihood(&self, theta: &[f64], _: &InferenceData<Vec<f64>>, _: &FixedConfig, _: Option<GridParam>) -> f64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            -(theta[0] - 90.0).powi(2)
        }

        fn sample_posteriors(&self, _: &Path, _: &FixedConfig, sampler: &SamplerSettings) -> Result<PathBuf, AppError> {
            sampler
                .outpost
                .clone()
                .ok_or_else(|| AppError::model("no output path"))
        }
    }

    fn settings(dir: &Path) -> FitSettings {
        let dataset = dir.join("obs.ms");
        fs::write(&dataset, b"").unwrap();
        FitSettings {
            dataset: Some(dataset),
            model_type: ModelType::Mcfost,
            param_set: vec!["PA".into()],
            nwalk: 8,
            nthreads: 4,
            output_dir: dir.to_path_buf(),
            ..FitSettings::default()
        }
    }

    #[test]
    fn missing_dataset_is_config_error() {
        let err = InferenceController::new(FitSettings::default(), Counting::default(), &PriorCatalog::with_defaults())
            .err()
            .unwrap();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unknown_prior_set_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(dir.path());
        s.param_set = vec!["inclination".into()];
        let err = InferenceController::new(s, Counting::default(), &PriorCatalog::with_defaults())
            .err()
            .unwrap();
        assert!(err.message().contains("MCFOST_inclination"));
    }

    #[test]
    fn initialise_caches_context() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = InferenceController::new(settings(dir.path()), Counting::default(), &PriorCatalog::with_defaults()).unwrap();
        let ctx = ctl.initialise().unwrap();
        assert!(ctx.is_cached());
        assert_eq!(ctx.nobs(), 2);
    }

    #[test]
    fn probability_adds_scaled_prior() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = InferenceController::new(settings(dir.path()), Counting::default(), &PriorCatalog::with_defaults()).unwrap();
        let ctx = ctl.initialise().unwrap();
        let lp = ctl.get_probability(&ctx, &[80.0]).unwrap();
        // PA prior is uniform on [0, 360]; Nobs = 2.
        let expected = -100.0 - 2.0 * 360.0_f64.ln();
        assert!((lp - expected).abs() < 1e-9);
        assert!(ctl.get_probability(&ctx, &[80.0, 1.0]).is_err());
    }

    #[test]
    fn scan_returns_ordered_results_and_plot() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = InferenceController::new(settings(dir.path()), Counting::default(), &PriorCatalog::with_defaults()).unwrap();
        let ctx = ctl.initialise().unwrap();
        let scan = ctl.brute_force(&ctx, "PA").unwrap().unwrap();
        assert_eq!(scan.len(), 360);
        for (x, lp) in scan.values.iter().zip(&scan.ln_posteriors) {
            assert_eq!(*lp, -(x - 90.0).powi(2));
        }
        assert_eq!(scan.best(), Some((90.0, 0.0)));
        let plot = scan.plot_path.unwrap();
        assert_eq!(plot, dir.path().join("PAlnposterior.pdf"));
        assert!(plot.exists());
    }

    #[test]
    fn unknown_scan_parameter_does_no_work() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = InferenceController::new(settings(dir.path()), Counting::default(), &PriorCatalog::with_defaults()).unwrap();
        let ctx = ctl.initialise().unwrap();
        assert!(ctl.brute_force(&ctx, "inclination").unwrap().is_none());
        assert_eq!(ctl.model().calls.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("inclinationlnposterior.pdf").exists());
    }

    #[test]
    fn mcmc_fit_defaults_chain_path_to_dataset_stem() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = InferenceController::new(settings(dir.path()), Counting::default(), &PriorCatalog::with_defaults()).unwrap();
        assert_eq!(ctl.mcmc_fit().unwrap(), PathBuf::from("obs.DATA.h5"));
        let sampler = ctl.sampler_settings();
        assert_eq!((sampler.nwalk, sampler.nthreads, sampler.ninits, sampler.nsteps), (75, 6, 10, 50));
    }

    #[test]
    fn sampler_receives_fitted_window_and_rest_frequency() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(dir.path());
        s.vra = (1.0e3, 2.0e3);
        s.nu_rest = 230.538e9;
        s.sampler.append = true;
        s.sampler.outpost = Some(dir.path().join("chain.h5"));
        let ctl = InferenceController::new(s, Counting::default(), &PriorCatalog::with_defaults()).unwrap();

        let sampler = ctl.sampler_settings();
        assert_eq!(sampler.vra, (1.0e3, 2.0e3));
        assert_eq!(sampler.restfreq, 230.538e9);
        assert!(sampler.append);
        assert_eq!(sampler.outpost.as_deref(), Some(dir.path().join("chain.h5").as_path()));
        assert_eq!(ctl.mcmc_fit().unwrap(), dir.path().join("chain.h5"));
    }

    #[test]
    fn prior_resolved_by_caller_is_used_as_is() {
        use crate::priors::{ParamPrior, PriorKind};

        let dir = tempfile::tempdir().unwrap();
        let prior = PriorSpec::new(
            "PA_narrow",
            vec![ParamPrior::new("PA", PriorKind::Uniform { lo: 80.0, hi: 100.0 })],
        )
        .unwrap();
        let ctl = InferenceController::with_prior(settings(dir.path()), Counting::default(), prior).unwrap();
        assert_eq!(ctl.prior().name, "PA_narrow");

        let ctx = ctl.initialise().unwrap();
        let expected = -1.0 - 2.0 * 20.0_f64.ln();
        assert!((ctl.get_probability(&ctx, &[89.0]).unwrap() - expected).abs() < 1e-9);
        assert_eq!(ctl.get_probability(&ctx, &[70.0]).unwrap(), f64::NEG_INFINITY);

        let mut missing = settings(dir.path());
        missing.dataset = Some(dir.path().join("absent.ms"));
        let err = InferenceController::with_prior(missing, Counting::default(), ctl.prior().clone())
            .err()
            .unwrap();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn explicit_config_overrides_are_merged_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(dir.path());
        s.overrides = ConfigOverrides {
            npix: Some(512),
            ..ConfigOverrides::default()
        };
        let ctl = InferenceController::new(s, Counting::default(), &PriorCatalog::with_defaults()).unwrap();
        assert_eq!(ctl.config().npix, 512);
        assert_eq!(ctl.config().fov, 6.375);
    }
}
