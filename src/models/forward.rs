//! Forward-model collaborator interface.
//!
//! The inference engine never looks inside a model's payload. It only needs four
//! operations:
//!
//! - `fitdata`: load a dataset into an uncached context
//! - `cache`: materialise whatever the model precomputes for fast evaluation
//! - `log_likelihood`: score one parameter vector against a cached context
//! - `sample_posteriors`: run a full posterior sampler and report where the chain went
//!
//! Implementations must be `Sync`: the grid evaluator shares one model across all
//! pool workers and hands each worker its own context clone.

use std::path::{Path, PathBuf};

use crate::data::{FitDataOptions, InferenceData};
use crate::domain::{FixedConfig, GridParam, SamplerSettings};
use crate::error::AppError;

pub trait ForwardModel: Sync {
    /// Model-specific dataset payload.
    type Data: Clone + Send + Sync;

    /// Load `dataset` into an inference context.
    fn fitdata(&self, dataset: &Path, opts: &FitDataOptions) -> Result<InferenceData<Self::Data>, AppError>;

    /// Precompute per-dataset quantities.
    ///
    /// `walkers` are the initial prior draws; models may use them to size
    /// internal buffers.
    fn cache(
        &self,
        walkers: &[Vec<f64>],
        data: InferenceData<Self::Data>,
        restfreq: f64,
        cfg: &FixedConfig,
    ) -> Result<InferenceData<Self::Data>, AppError>;

    /// Natural-log likelihood of `theta`.
    ///
    /// With `param = Some(p)`, `theta` is the single value of `p` being swept and
    /// every other parameter takes the model's fiducial value. Returns `-inf` for
    /// parameter vectors the model cannot evaluate.
    fn log_likelihood(
        &self,
        theta: &[f64],
        ctx: &InferenceData<Self::Data>,
        cfg: &FixedConfig,
        param: Option<GridParam>,
    ) -> f64;

    /// Run the posterior sampler and return the chain file it wrote.
    fn sample_posteriors(
        &self,
        dataset: &Path,
        cfg: &FixedConfig,
        sampler: &SamplerSettings,
    ) -> Result<PathBuf, AppError>;
}
