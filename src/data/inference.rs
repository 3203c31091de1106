//! Per-dataset inference context.
//!
//! An [`InferenceData`] is built once per dataset by a forward model (`fitdata`
//! followed by `cache`) and is read-only afterwards. The bookkeeping every engine
//! needs (rest frequency, observation count, fitted velocity window) lives in
//! [`ContextMeta`]; everything model-specific lives in the payload.

use serde::{Deserialize, Serialize};

/// Options passed to a forward model when it loads a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitDataOptions {
    /// Fitted velocity range [m/s].
    pub vra: (f64, f64),
    /// Velocity ranges excluded from the fit [m/s].
    pub vcensor: Vec<(f64, f64)>,
    /// Line rest frequency [Hz].
    pub restfreq: f64,
}

/// Dataset bookkeeping shared by all forward models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMeta {
    pub restfreq: f64,
    /// Number of independent observations (execution blocks); scales the prior.
    pub nobs: usize,
    pub vra: (f64, f64),
    pub vcensor: Vec<(f64, f64)>,
    /// Padding channels kept on each side of the fitted window.
    pub chpad: usize,
    /// Spectral upsampling factor chosen at cache time.
    pub nup: Option<usize>,
    /// Set once the forward model has materialised its precomputed quantities.
    pub cached: bool,
}

impl ContextMeta {
    pub fn new(opts: &FitDataOptions, nobs: usize) -> Self {
        Self {
            restfreq: opts.restfreq,
            nobs,
            vra: opts.vra,
            vcensor: opts.vcensor.clone(),
            chpad: 0,
            nup: None,
            cached: false,
        }
    }
}

/// Inference context: bookkeeping plus a model-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceData<D> {
    pub meta: ContextMeta,
    pub payload: D,
}

impl<D> InferenceData<D> {
    pub fn new(meta: ContextMeta, payload: D) -> Self {
        Self { meta, payload }
    }

    pub fn nobs(&self) -> usize {
        self.meta.nobs
    }

    pub fn is_cached(&self) -> bool {
        self.meta.cached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_starts_uncached() {
        let opts = FitDataOptions {
            vra: (1.0e3, 2.0e3),
            vcensor: vec![(1.2e3, 1.3e3)],
            restfreq: 230.538e9,
        };
        let meta = ContextMeta::new(&opts, 3);
        assert_eq!(meta.nobs, 3);
        assert!(!meta.cached);
        assert_eq!(meta.vcensor.len(), 1);
    }
}
