//! Prior registry.
//!
//! A [`PriorSpec`] is a named, ordered list of one-dimensional priors; its order
//! defines the layout of the parameter vector. The [`PriorCatalog`] maps prior
//! names (`<MODEL>` or `<MODEL>_<param>...`) to specs and is populated explicitly,
//! either from [`PriorCatalog::with_defaults`] or by [`PriorCatalog::register`].

use std::collections::BTreeMap;
use std::f64::consts::PI;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Shape of a one-dimensional prior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriorKind {
    /// Flat on `[lo, hi]`.
    Uniform { lo: f64, hi: f64 },
    /// Flat in `ln x` on `[lo, hi]`, `lo > 0`.
    LogUniform { lo: f64, hi: f64 },
    Normal { mean: f64, std: f64 },
}

impl PriorKind {
    /// Natural-log density at `x`; `-inf` outside the support.
    pub fn log_density(&self, x: f64) -> f64 {
        match *self {
            PriorKind::Uniform { lo, hi } => {
                if x >= lo && x <= hi {
                    -(hi - lo).ln()
                } else {
                    f64::NEG_INFINITY
                }
            }
            PriorKind::LogUniform { lo, hi } => {
                if x >= lo && x <= hi {
                    -x.ln() - (hi / lo).ln().ln()
                } else {
                    f64::NEG_INFINITY
                }
            }
            PriorKind::Normal { mean, std } => {
                let u = (x - mean) / std;
                -0.5 * u * u - (std * (2.0 * PI).sqrt()).ln()
            }
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            PriorKind::Uniform { lo, hi } => rng.gen_range(lo..=hi),
            PriorKind::LogUniform { lo, hi } => rng.gen_range(lo.ln()..=hi.ln()).exp(),
            PriorKind::Normal { mean, std } => match Normal::new(mean, std) {
                Ok(dist) => dist.sample(rng),
                Err(_) => mean,
            },
        }
    }

    fn validate(&self) -> Result<(), String> {
        match *self {
            PriorKind::Uniform { lo, hi } if !(lo < hi) => Err(format!("uniform bounds [{lo}, {hi}] are empty")),
            PriorKind::LogUniform { lo, hi } if !(lo > 0.0 && lo < hi) => {
                Err(format!("log-uniform bounds [{lo}, {hi}] must satisfy 0 < lo < hi"))
            }
            PriorKind::Normal { std, .. } if !(std > 0.0 && std.is_finite()) => {
                Err(format!("normal width {std} must be positive"))
            }
            _ => Ok(()),
        }
    }
}

/// One named parameter and its prior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamPrior {
    pub name: String,
    pub kind: PriorKind,
}

impl ParamPrior {
    pub fn new(name: impl Into<String>, kind: PriorKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A named, ordered set of per-parameter priors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorSpec {
    pub name: String,
    pub params: Vec<ParamPrior>,
}

impl PriorSpec {
    pub fn new(name: impl Into<String>, params: Vec<ParamPrior>) -> Result<Self, AppError> {
        let name = name.into();
        if params.is_empty() {
            return Err(AppError::config(format!("Prior set '{name}' has no parameters.")));
        }
        for p in &params {
            p.kind
                .validate()
                .map_err(|e| AppError::config(format!("Prior set '{name}', parameter `{}`: {e}", p.name)))?;
        }
        Ok(Self { name, params })
    }

    pub fn dim(&self) -> usize {
        self.params.len()
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    /// Per-parameter log-densities.
    ///
    /// Callers check `theta.len() == self.dim()` first; extra entries are ignored.
    pub fn log_prior(&self, theta: &[f64]) -> Vec<f64> {
        self.params
            .iter()
            .zip(theta)
            .map(|(p, &x)| p.kind.log_density(x))
            .collect()
    }

    /// Draw `n` parameter vectors from the priors.
    pub fn initial_walkers<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Vec<f64>> {
        (0..n)
            .map(|_| self.params.iter().map(|p| p.kind.sample(rng)).collect())
            .collect()
    }
}

/// Registry of prior sets, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct PriorCatalog {
    specs: BTreeMap<String, PriorSpec>,
}

impl PriorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the built-in prior sets for both model families.
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        for spec in default_specs() {
            catalog.register(spec);
        }
        catalog
    }

    /// Add or replace a prior set.
    pub fn register(&mut self, spec: PriorSpec) {
        if self.specs.contains_key(&spec.name) {
            log::debug!("Replacing prior set '{}'", spec.name);
        }
        self.specs.insert(spec.name.clone(), spec);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&PriorSpec> {
        self.specs.get(name)
    }

    /// Look up a prior set; an unknown name is a configuration error.
    pub fn resolve(&self, name: &str) -> Result<PriorSpec, AppError> {
        self.specs.get(name).cloned().ok_or_else(|| {
            let known: Vec<&str> = self.names().collect();
            AppError::config(format!(
                "Unknown prior set '{name}'. Known sets: {}",
                known.join(", ")
            ))
        })
    }
}

fn uniform(name: &str, lo: f64, hi: f64) -> ParamPrior {
    ParamPrior::new(name, PriorKind::Uniform { lo, hi })
}

fn log_uniform(name: &str, lo: f64, hi: f64) -> ParamPrior {
    ParamPrior::new(name, PriorKind::LogUniform { lo, hi })
}

fn default_specs() -> Vec<PriorSpec> {
    let stellar_mass = || uniform("stellar_mass", 0.1, 3.0);
    let disk_mass = || uniform("disk_mass", 0.0, 0.5);
    let position_angle = || uniform("PA", 0.0, 360.0);
    let vturb = || uniform("vturb", 0.0, 0.5);
    let dust_param = || log_uniform("dust_param", 0.5, 200.0);

    let sets: Vec<(&str, Vec<ParamPrior>)> = vec![
        ("VEXACT", vec![stellar_mass(), disk_mass(), uniform("ln_f", -10.0, 1.0)]),
        ("VEXACT_stellar_mass", vec![stellar_mass()]),
        ("VEXACT_disk_mass", vec![disk_mass()]),
        (
            "MCFOST",
            vec![
                uniform("inclination", -90.0, 90.0),
                stellar_mass(),
                uniform("h_c", 1.0, 30.0),
                uniform("r_c", 10.0, 500.0),
                uniform("psi", 1.0, 1.5),
                position_angle(),
                dust_param(),
                vturb(),
                uniform("dv", 0.0, 0.5),
            ],
        ),
        ("MCFOST_PA", vec![position_angle()]),
        ("MCFOST_stellar_mass", vec![stellar_mass()]),
        ("MCFOST_vturb", vec![vturb()]),
        ("MCFOST_dust_param", vec![dust_param()]),
    ];

    // Built-in bounds are valid by construction.
    sets.into_iter()
        .map(|(name, params)| PriorSpec {
            name: name.to_string(),
            params,
        })
        .collect()
}
