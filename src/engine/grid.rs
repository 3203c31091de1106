//! One-dimensional brute-force scans.
//!
//! A scan sweeps a single physical parameter over a preset grid and scores each
//! value with the forward model's log-likelihood. Evaluation runs on a dedicated
//! fixed-size rayon pool:
//!
//! - each worker owns one clone of the context and config (`map_init`)
//! - results come back in grid order
//! - `OMP_NUM_THREADS=1` is set for the duration of the scan so native code
//!   called by a model does not oversubscribe the pool

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::InferenceData;
use crate::domain::{FixedConfig, GridParam};
use crate::error::AppError;
use crate::models::ForwardModel;

/// Spacing of a grid preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridScale {
    /// `value_i = start + i * step`
    Linear,
    /// `value_i = 10^(start + i * step)`
    Log10,
}

/// A reproducible sweep definition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPreset {
    pub start: f64,
    pub step: f64,
    pub count: usize,
    pub scale: GridScale,
}

impl GridPreset {
    pub fn linear(start: f64, step: f64, count: usize) -> Self {
        Self {
            start,
            step,
            count,
            scale: GridScale::Linear,
        }
    }

    pub fn log10(start_exp: f64, step: f64, count: usize) -> Self {
        Self {
            start: start_exp,
            step,
            count,
            scale: GridScale::Log10,
        }
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.count)
            .map(|i| {
                let x = self.start + i as f64 * self.step;
                match self.scale {
                    GridScale::Linear => x,
                    GridScale::Log10 => 10f64.powf(x),
                }
            })
            .collect()
    }
}

/// Preset per scannable parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPresets {
    presets: BTreeMap<String, GridPreset>,
}

impl Default for GridPresets {
    fn default() -> Self {
        let mut presets = BTreeMap::new();
        presets.insert(GridParam::Pa.name().to_string(), GridPreset::linear(0.0, 1.0, 360));
        presets.insert(
            GridParam::StellarMass.name().to_string(),
            GridPreset::linear(0.2, 1.0 / 250.0, 100),
        );
        presets.insert(GridParam::Vturb.name().to_string(), GridPreset::linear(0.0, 1.0 / 500.0, 100));
        presets.insert(GridParam::DustParam.name().to_string(), GridPreset::log10(0.0, 1.0 / 50.0, 100));
        Self { presets }
    }
}

impl GridPresets {
    pub fn get(&self, param: GridParam) -> Option<&GridPreset> {
        self.presets.get(param.name())
    }

    pub fn set(&mut self, param: GridParam, preset: GridPreset) {
        self.presets.insert(param.name().to_string(), preset);
    }
}

/// Output of a brute-force scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub param: GridParam,
    pub values: Vec<f64>,
    /// `ln_posteriors[i]` belongs to `values[i]`.
    pub ln_posteriors: Vec<f64>,
    /// Vector plot written for this scan, if any.
    pub plot_path: Option<PathBuf>,
}

impl ScanResult {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Grid value with the highest finite log-posterior; ties go to the lowest index.
    pub fn best(&self) -> Option<(f64, f64)> {
        let mut best: Option<(f64, f64)> = None;
        for (&x, &lp) in self.values.iter().zip(&self.ln_posteriors) {
            if !lp.is_finite() {
                continue;
            }
            match best {
                Some((_, b)) if lp <= b => {}
                _ => best = Some((x, lp)),
            }
        }
        best
    }
}

/// Sets `OMP_NUM_THREADS=1` and restores the previous value on drop.
///
/// Guards are exclusive: a second scan waits until the first guard is dropped.
pub struct SingleThreadGuard {
    previous: Option<OsString>,
    _lock: MutexGuard<'static, ()>,
}

const OMP_NUM_THREADS: &str = "OMP_NUM_THREADS";

static ENV_LOCK: Mutex<()> = Mutex::new(());

impl SingleThreadGuard {
    pub fn new() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = std::env::var_os(OMP_NUM_THREADS);
        // SAFETY: environment writes in this crate happen only while ENV_LOCK is
        // held, and the scan pool is built after the variable is set.
        unsafe { std::env::set_var(OMP_NUM_THREADS, "1") };
        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Default for SingleThreadGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SingleThreadGuard {
    fn drop(&mut self) {
        // SAFETY (both arms): ENV_LOCK is still held and the scan pool has finished.
        match self.previous.take() {
            Some(v) => unsafe { std::env::set_var(OMP_NUM_THREADS, v) },
            None => unsafe { std::env::remove_var(OMP_NUM_THREADS) },
        }
    }
}

/// Score every grid value on a pool of `nthreads` workers.
///
/// Blocks until all values are done; a worker panic propagates after the pool
/// finishes.
pub fn evaluate_grid<M: ForwardModel>(
    model: &M,
    ctx: &InferenceData<M::Data>,
    cfg: &FixedConfig,
    param: GridParam,
    grid: &[f64],
    nthreads: usize,
) -> Result<Vec<f64>, AppError> {
    let _guard = SingleThreadGuard::new();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(nthreads.max(1))
        .build()
        .map_err(|e| AppError::config(format!("Failed to build a {nthreads}-thread worker pool: {e}")))?;
    log::info!("Scanning `{param}` over {} values on {} threads", grid.len(), pool.current_num_threads());

    let results = pool.install(|| {
        grid.par_iter()
            .map_init(
                || (ctx.clone(), cfg.clone()),
                |(ctx, cfg), &value| model.log_likelihood(&[value], ctx, cfg, Some(param)),
            )
            .collect()
    });
    Ok(results)
}

/// Same as [`evaluate_grid`], on the calling thread.
pub fn evaluate_serial<M: ForwardModel>(
    model: &M,
    ctx: &InferenceData<M::Data>,
    cfg: &FixedConfig,
    param: GridParam,
    grid: &[f64],
) -> Vec<f64> {
    grid.iter()
        .map(|&value| model.log_likelihood(&[value], ctx, cfg, Some(param)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_presets_match_documented_sweeps() {
        let presets = GridPresets::default();

        let pa = presets.get(GridParam::Pa).unwrap().values();
        assert_eq!(pa.len(), 360);
        assert_eq!(pa[0], 0.0);
        assert_eq!(pa[359], 359.0);

        let mstar = presets.get(GridParam::StellarMass).unwrap().values();
        assert_eq!(mstar.len(), 100);
        assert!((mstar[0] - 0.2).abs() < 1e-12);
        assert!((mstar[99] - (0.2 + 99.0 / 250.0)).abs() < 1e-12);

        let vturb = presets.get(GridParam::Vturb).unwrap().values();
        assert!((vturb[50] - 0.1).abs() < 1e-12);

        let dust = presets.get(GridParam::DustParam).unwrap().values();
        assert!((dust[0] - 1.0).abs() < 1e-12);
        assert!((dust[50] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn presets_are_configurable() {
        let mut presets = GridPresets::default();
        presets.set(GridParam::StellarMass, GridPreset::linear(1.0, 0.5, 3));
        assert_eq!(presets.get(GridParam::StellarMass).unwrap().values(), vec![1.0, 1.5, 2.0]);
    }

    #[test]
    fn best_skips_non_finite_and_keeps_first_tie() {
        let scan = ScanResult {
            param: GridParam::Vturb,
            values: vec![0.0, 1.0, 2.0, 3.0],
            ln_posteriors: vec![f64::NEG_INFINITY, -1.0, -1.0, f64::NAN],
            plot_path: None,
        };
        assert_eq!(scan.best(), Some((1.0, -1.0)));
    }

    #[test]
    fn guard_sets_and_restores_thread_directive() {
        let before = std::env::var_os(OMP_NUM_THREADS);
        {
            let _guard = SingleThreadGuard::new();
            assert_eq!(std::env::var(OMP_NUM_THREADS).as_deref(), Ok("1"));
        }
        assert_eq!(std::env::var_os(OMP_NUM_THREADS), before);
    }
}
