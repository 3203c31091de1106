//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - built from CLI flags or in code
//! - passed by value into pool workers
//! - written next to scan outputs for provenance

use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default rest frequency of the fitted line [Hz] (CO J=3-2).
pub const DEFAULT_RESTFREQ: f64 = 345.796e9;

/// Forward-model family. Prior names are built from this prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum ModelType {
    /// Radiative-transfer visibility model.
    #[value(name = "MCFOST")]
    Mcfost,
    /// Exact self-gravitating rotation curve.
    #[value(name = "VEXACT")]
    Vexact,
}

impl ModelType {
    pub fn prefix(self) -> &'static str {
        match self {
            ModelType::Mcfost => "MCFOST",
            ModelType::Vexact => "VEXACT",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Physical parameters that have a brute-force scan preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridParam {
    /// Position angle [deg].
    #[serde(rename = "PA")]
    Pa,
    /// Stellar mass [Msun].
    #[serde(rename = "stellar_mass")]
    StellarMass,
    /// Turbulent velocity (fraction of the sound speed).
    #[serde(rename = "vturb")]
    Vturb,
    /// Dust parameter, swept on a log scale.
    #[serde(rename = "dust_param")]
    DustParam,
}

impl GridParam {
    pub const ALL: [GridParam; 4] = [
        GridParam::Pa,
        GridParam::StellarMass,
        GridParam::Vturb,
        GridParam::DustParam,
    ];

    /// Name used in prior-set names and output file names.
    pub fn name(self) -> &'static str {
        match self {
            GridParam::Pa => "PA",
            GridParam::StellarMass => "stellar_mass",
            GridParam::Vturb => "vturb",
            GridParam::DustParam => "dust_param",
        }
    }

    /// Resolve a parameter name; `None` for anything without a preset.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for GridParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How channel frequencies are mapped to velocities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DopplerCorrection {
    /// Radio convention at a single reference epoch.
    Approx,
    /// Per-timestamp correction (handled by the visibility model).
    Exact,
}

/// Spectral response function applied to model channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum SpectralResponse {
    #[serde(rename = "ALMA")]
    #[value(name = "ALMA")]
    Alma,
    #[serde(rename = "ALMA-WSU")]
    #[value(name = "ALMA-WSU")]
    AlmaWsu,
}

/// Synthetic noise added to model visibilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseInjection {
    /// RMS per visibility [Jy].
    pub rms: f64,
    pub seed: u64,
}

/// User-supplied config values; anything left `None` takes its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigOverrides {
    pub restfreq: Option<f64>,
    pub fov: Option<f64>,
    pub npix: Option<usize>,
    pub dist: Option<f64>,
    pub chpad: Option<usize>,
    pub nup: Option<Option<usize>>,
    pub noise_inject: Option<Option<NoiseInjection>>,
    pub doppcorr: Option<DopplerCorrection>,
    pub srf: Option<SpectralResponse>,
    pub vsyst: Option<f64>,
}

impl ConfigOverrides {
    /// Overlay `other` on top of `self`; values set in `other` win.
    pub fn merged_with(&self, other: &ConfigOverrides) -> ConfigOverrides {
        ConfigOverrides {
            restfreq: other.restfreq.or(self.restfreq),
            fov: other.fov.or(self.fov),
            npix: other.npix.or(self.npix),
            dist: other.dist.or(self.dist),
            chpad: other.chpad.or(self.chpad),
            nup: other.nup.or(self.nup),
            noise_inject: other.noise_inject.or(self.noise_inject),
            doppcorr: other.doppcorr.or(self.doppcorr),
            srf: other.srf.or(self.srf),
            vsyst: other.vsyst.or(self.vsyst),
        }
    }
}

/// Complete, immutable model configuration handed to the forward model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedConfig {
    /// Line rest frequency [Hz].
    pub restfreq: f64,
    /// Field of view [arcsec].
    pub fov: f64,
    /// Image size [pixels per side].
    pub npix: usize,
    /// Source distance [pc].
    pub dist: f64,
    /// Extra channels kept on each side of the fitted velocity range.
    pub chpad: usize,
    /// Spectral upsampling factor; `None` lets the model choose.
    pub nup: Option<usize>,
    pub noise_inject: Option<NoiseInjection>,
    pub doppcorr: DopplerCorrection,
    pub srf: SpectralResponse,
    /// Systemic velocity [m/s], if fixed.
    pub vsyst: Option<f64>,
}

impl FixedConfig {
    /// Defaults for every documented key.
    pub fn defaults(restfreq: f64) -> Self {
        Self {
            restfreq,
            fov: 5.0,
            npix: 256,
            dist: 150.0,
            chpad: 2,
            nup: None,
            noise_inject: None,
            doppcorr: DopplerCorrection::Approx,
            srf: SpectralResponse::Alma,
            vsyst: None,
        }
    }

    /// Merge overrides into the defaults once.
    pub fn resolve(overrides: &ConfigOverrides, default_restfreq: f64) -> Self {
        let d = Self::defaults(default_restfreq);
        Self {
            restfreq: overrides.restfreq.unwrap_or(d.restfreq),
            fov: overrides.fov.unwrap_or(d.fov),
            npix: overrides.npix.unwrap_or(d.npix),
            dist: overrides.dist.unwrap_or(d.dist),
            chpad: overrides.chpad.unwrap_or(d.chpad),
            nup: overrides.nup.unwrap_or(d.nup),
            noise_inject: overrides.noise_inject.unwrap_or(d.noise_inject),
            doppcorr: overrides.doppcorr.unwrap_or(d.doppcorr),
            srf: overrides.srf.unwrap_or(d.srf),
            vsyst: overrides.vsyst.or(d.vsyst),
        }
    }

    /// The same values, expressed as a fully populated override set.
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            restfreq: Some(self.restfreq),
            fov: Some(self.fov),
            npix: Some(self.npix),
            dist: Some(self.dist),
            chpad: Some(self.chpad),
            nup: Some(self.nup),
            noise_inject: Some(self.noise_inject),
            doppcorr: Some(self.doppcorr),
            srf: Some(self.srf),
            vsyst: self.vsyst,
        }
    }
}

/// Settings handed to the posterior-sampling collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerSettings {
    pub nwalk: usize,
    pub nthreads: usize,
    pub ninits: usize,
    pub nsteps: usize,
    /// Chain output path; `None` derives `<dataset stem>.DATA.h5`.
    pub outpost: Option<PathBuf>,
    /// Continue an existing chain instead of starting fresh.
    pub append: bool,
    /// Fitted velocity range [m/s].
    pub vra: (f64, f64),
    pub restfreq: f64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            nwalk: 75,
            nthreads: 6,
            ninits: 10,
            nsteps: 50,
            outpost: None,
            append: false,
            vra: (4.06e3, 8.06e3),
            restfreq: DEFAULT_RESTFREQ,
        }
    }
}

/// Default chain path for a dataset: `<stem>.DATA.h5` next to the working directory.
pub fn default_chain_path(dataset: &Path) -> PathBuf {
    let stem = dataset
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "posteriors".to_string());
    PathBuf::from(format!("{stem}.DATA.h5"))
}

/// Everything an inference run is configured with.
///
/// This is derived from CLI flags (plus defaults) or built directly in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSettings {
    /// Dataset handle; required.
    pub dataset: Option<PathBuf>,
    pub model_type: ModelType,
    /// Parameter-set suffixes appended to the prior name (`MCFOST_stellar_mass`).
    pub param_set: Vec<String>,

    /// Fitted velocity range [m/s].
    pub vra: (f64, f64),
    /// Velocity ranges excluded from the fit [m/s].
    pub vcensor: Vec<(f64, f64)>,
    pub vsyst: Option<f64>,
    pub nu_rest: f64,

    /// Initial walker count drawn from the prior in `initialise`.
    pub nwalk: usize,
    /// Worker-pool size for brute-force scans.
    pub nthreads: usize,
    /// Seed for initial walker draws.
    pub seed: u64,

    pub fov: f64,
    pub npix: usize,
    pub dist: f64,
    /// Explicit config values; these win over the fields above.
    pub overrides: ConfigOverrides,

    pub sampler: SamplerSettings,
    /// Directory for diagnostic plots.
    pub output_dir: PathBuf,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            dataset: None,
            model_type: ModelType::Mcfost,
            param_set: Vec::new(),
            vra: (4.06e3, 8.06e3),
            vcensor: Vec::new(),
            vsyst: None,
            nu_rest: DEFAULT_RESTFREQ,
            nwalk: 128,
            nthreads: 32,
            seed: 42,
            fov: 6.375,
            npix: 256,
            dist: 144.5,
            overrides: ConfigOverrides::default(),
            sampler: SamplerSettings::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl FitSettings {
    /// Prior name: the model prefix followed by `_<param>` for each parameter-set entry.
    pub fn prior_name(&self) -> String {
        let mut name = self.model_type.prefix().to_string();
        for p in &self.param_set {
            name.push('_');
            name.push_str(p);
        }
        name
    }

    /// Merge constructor values and explicit overrides into the model config.
    pub fn fixed_config(&self) -> FixedConfig {
        let from_settings = ConfigOverrides {
            fov: Some(self.fov),
            npix: Some(self.npix),
            dist: Some(self.dist),
            vsyst: self.vsyst,
            ..ConfigOverrides::default()
        };
        FixedConfig::resolve(&from_settings.merged_with(&self.overrides), self.nu_rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_overrides_resolve_to_documented_defaults() {
        let cfg = FixedConfig::resolve(&ConfigOverrides::default(), 230.538e9);
        assert_eq!(cfg, FixedConfig::defaults(230.538e9));
        assert_eq!(cfg.fov, 5.0);
        assert_eq!(cfg.npix, 256);
        assert_eq!(cfg.dist, 150.0);
        assert_eq!(cfg.chpad, 2);
        assert_eq!(cfg.nup, None);
        assert_eq!(cfg.noise_inject, None);
        assert_eq!(cfg.doppcorr, DopplerCorrection::Approx);
        assert_eq!(cfg.srf, SpectralResponse::Alma);
    }

    #[test]
    fn complete_overrides_round_trip() {
        let cfg = FixedConfig::defaults(DEFAULT_RESTFREQ);
        assert_eq!(FixedConfig::resolve(&cfg.to_overrides(), 1.0), cfg);
    }

    #[test]
    fn explicit_overrides_beat_settings() {
        let settings = FitSettings {
            fov: 8.0,
            overrides: ConfigOverrides {
                fov: Some(3.0),
                chpad: Some(5),
                ..ConfigOverrides::default()
            },
            ..FitSettings::default()
        };
        let cfg = settings.fixed_config();
        assert_eq!(cfg.fov, 3.0);
        assert_eq!(cfg.chpad, 5);
        assert_eq!(cfg.npix, 256);
        assert_eq!(cfg.dist, 144.5);
        assert_eq!(cfg.restfreq, DEFAULT_RESTFREQ);
    }

    #[test]
    fn prior_name_joins_param_set() {
        let mut settings = FitSettings::default();
        assert_eq!(settings.prior_name(), "MCFOST");
        settings.param_set = vec!["stellar_mass".into()];
        assert_eq!(settings.prior_name(), "MCFOST_stellar_mass");
    }

    #[test]
    fn grid_param_names_round_trip() {
        for p in GridParam::ALL {
            assert_eq!(GridParam::from_name(p.name()), Some(p));
        }
        assert_eq!(GridParam::from_name("inclination"), None);
    }

    #[test]
    fn chain_path_uses_dataset_stem() {
        assert_eq!(
            default_chain_path(Path::new("/data/DMTau_EB3.ms")),
            PathBuf::from("DMTau_EB3.DATA.h5")
        );
    }
}
