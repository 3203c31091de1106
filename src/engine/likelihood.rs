//! Log-posterior evaluation.
//!
//! `ln P(theta) = ln L(theta) + Nobs * Σ ln prior_i(theta_i)`
//!
//! The prior is counted once per independent observation so that datasets with
//! several execution blocks are not dominated by their likelihood alone.

use crate::data::InferenceData;
use crate::domain::FixedConfig;
use crate::error::AppError;
use crate::models::ForwardModel;
use crate::priors::PriorSpec;

/// Borrowed view of everything a log-posterior evaluation needs besides the context.
#[derive(Debug, Clone, Copy)]
pub struct LogLikelihoodEngine<'a, M> {
    model: &'a M,
    prior: &'a PriorSpec,
    config: &'a FixedConfig,
}

impl<'a, M: ForwardModel> LogLikelihoodEngine<'a, M> {
    pub fn new(model: &'a M, prior: &'a PriorSpec, config: &'a FixedConfig) -> Self {
        Self { model, prior, config }
    }

    /// Log-posterior of `theta`.
    ///
    /// Errors only on a dimension mismatch. If either term is `-inf` the result
    /// is `-inf`.
    pub fn evaluate(&self, theta: &[f64], ctx: &InferenceData<M::Data>) -> Result<f64, AppError> {
        if theta.len() != self.prior.dim() {
            return Err(AppError::config(format!(
                "Parameter vector has {} entries but prior set '{}' expects {}.",
                theta.len(),
                self.prior.name,
                self.prior.dim()
            )));
        }

        let ln_prior = self.log_prior(theta, ctx.nobs());
        if ln_prior == f64::NEG_INFINITY {
            return Ok(f64::NEG_INFINITY);
        }

        let ln_like = self.model.log_likelihood(theta, ctx, self.config, None);
        log::trace!("theta={theta:?} lnL={ln_like} lnprior={ln_prior}");
        Ok(combine(ln_like, ln_prior))
    }

    /// `Nobs * Σ ln prior_i`.
    pub fn log_prior(&self, theta: &[f64], nobs: usize) -> f64 {
        let sum: f64 = self.prior.log_prior(theta).iter().sum();
        if sum == f64::NEG_INFINITY {
            sum
        } else {
            sum * nobs as f64
        }
    }
}

/// Sum of log-likelihood and log-prior with `-inf` absorbing.
pub fn combine(ln_like: f64, ln_prior: f64) -> f64 {
    if ln_like == f64::NEG_INFINITY || ln_prior == f64::NEG_INFINITY || ln_like.is_nan() {
        f64::NEG_INFINITY
    } else {
        ln_like + ln_prior
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use crate::data::{ContextMeta, FitDataOptions};
    use crate::domain::{GridParam, SamplerSettings};
    use crate::priors::{ParamPrior, PriorKind};

    /// Gaussian in every coordinate, centred on zero.
    struct Quadratic;

    impl ForwardModel for Quadratic {
        type Data = ();

        fn fitdata(&self, _: &Path, opts: &FitDataOptions) -> Result<InferenceData<()>, AppError> {
            Ok(InferenceData::new(ContextMeta::new(opts, 1), ()))
        }

        fn cache(&self, _: &[Vec<f64>], data: InferenceData<()>, _: f64, _: &FixedConfig) -> Result<InferenceData<()>, AppError> {
            Ok(data)
        }

        fn log_likelihood(&self, theta: &[f64], _: &InferenceData<()>, _: &FixedConfig, _: Option<GridParam>) -> f64 {
            -0.5 * theta.iter().map(|t| t * t).sum::<f64>()
        }

        fn sample_posteriors(&self, _: &Path, _: &FixedConfig, _: &SamplerSettings) -> Result<PathBuf, AppError> {
            Err(AppError::unsupported("no sampler"))
        }
    }

    fn context(nobs: usize) -> InferenceData<()> {
        let opts = FitDataOptions {
            vra: (0.0, 1.0),
            vcensor: Vec::new(),
            restfreq: 1.0,
        };
        InferenceData::new(ContextMeta::new(&opts, nobs), ())
    }

    fn prior() -> PriorSpec {
        PriorSpec::new(
            "TEST",
            vec![
                ParamPrior::new("a", PriorKind::Uniform { lo: -2.0, hi: 2.0 }),
                ParamPrior::new("b", PriorKind::Uniform { lo: -1.0, hi: 1.0 }),
            ],
        )
        .unwrap()
    }

    #[test]
    fn prior_is_scaled_by_observation_count() {
        let prior = prior();
        let cfg = FixedConfig::defaults(1.0);
        let engine = LogLikelihoodEngine::new(&Quadratic, &prior, &cfg);
        let one = engine.evaluate(&[1.0, 0.0], &context(1)).unwrap();
        let three = engine.evaluate(&[1.0, 0.0], &context(3)).unwrap();
        let ln_prior = -(4.0_f64.ln() + 2.0_f64.ln());
        assert!((one - (-0.5 + ln_prior)).abs() < 1e-12);
        assert!((three - (-0.5 + 3.0 * ln_prior)).abs() < 1e-12);
    }

    #[test]
    fn outside_prior_is_negative_infinity() {
        let prior = prior();
        let cfg = FixedConfig::defaults(1.0);
        let engine = LogLikelihoodEngine::new(&Quadratic, &prior, &cfg);
        assert_eq!(engine.evaluate(&[0.0, 5.0], &context(2)).unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn wrong_dimension_is_config_error() {
        let prior = prior();
        let cfg = FixedConfig::defaults(1.0);
        let engine = LogLikelihoodEngine::new(&Quadratic, &prior, &cfg);
        let err = engine.evaluate(&[0.0], &context(1)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn combine_absorbs_negative_infinity() {
        assert_eq!(combine(f64::NEG_INFINITY, 1.0), f64::NEG_INFINITY);
        assert_eq!(combine(1.0, f64::NEG_INFINITY), f64::NEG_INFINITY);
        assert_eq!(combine(f64::NAN, 0.0), f64::NEG_INFINITY);
        assert_eq!(combine(-1.5, -0.5), -2.0);
    }
}
