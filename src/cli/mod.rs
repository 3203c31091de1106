//! Command-line parsing for the self-gravitating disk inference tool.
//!
//! Argument parsing and command dispatch stay separate from the kernel and
//! engine code; `app` turns these structs into `FitSettings`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::ModelType;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sgfit", version, about = "Self-gravitating protoplanetary disk rotation-curve inference")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Evaluate the rotation-curve kernel on a radius grid.
    Vphi(VphiArgs),
    /// Print the log-posterior of one parameter vector for a dataset.
    Prob(ProbArgs),
    /// Brute-force scan of one parameter, with terminal and SVG plots.
    Scan(ScanArgs),
}

/// Options for `sgfit vphi`.
#[derive(Debug, Args, Clone)]
pub struct VphiArgs {
    /// Stellar mass [Msun].
    #[arg(long, default_value_t = 0.5)]
    pub mstar: f64,

    /// Disk mass [Msun].
    #[arg(long, default_value_t = 0.05)]
    pub mdisk: f64,

    /// Innermost radius [AU].
    #[arg(long, default_value_t = 5.0)]
    pub r_min: f64,

    /// Outermost radius [AU].
    #[arg(long, default_value_t = 300.0)]
    pub r_max: f64,

    /// Number of radii.
    #[arg(short = 'n', long, default_value_t = 60)]
    pub count: usize,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Write the curve as SVG.
    #[arg(long, value_name = "SVG")]
    pub svg: Option<PathBuf>,
}

/// Options shared by dataset-driven commands.
#[derive(Debug, Args, Clone)]
pub struct DatasetArgs {
    /// Rotation-curve CSV with columns radius_au, v_phi, sigma (m/s).
    pub dataset: PathBuf,

    /// Model family; selects the prior-set prefix.
    #[arg(long, value_enum, default_value_t = ModelType::Vexact)]
    pub model_type: ModelType,

    /// Parameter-set suffix appended to the prior-set name (repeatable).
    #[arg(long = "param-set", value_name = "NAME")]
    pub param_set: Vec<String>,

    /// Fitted velocity range `lo,hi` [m/s].
    #[arg(long, value_parser = parse_range, default_value = "4060,8060", allow_hyphen_values = true)]
    pub vra: (f64, f64),

    /// Censored velocity range `lo,hi` [m/s] (repeatable).
    #[arg(long, value_parser = parse_range, allow_hyphen_values = true)]
    pub vcensor: Vec<(f64, f64)>,

    /// Line rest frequency [Hz].
    #[arg(long, default_value_t = crate::domain::DEFAULT_RESTFREQ)]
    pub nu_rest: f64,

    /// Initial walkers drawn from the prior.
    #[arg(long, default_value_t = 128)]
    pub nwalk: usize,

    /// Seed for initial walker draws.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Fiducial stellar mass for parameters not being fitted [Msun].
    #[arg(long, default_value_t = 0.5)]
    pub fiducial_mstar: f64,

    /// Fiducial disk mass for parameters not being fitted [Msun].
    #[arg(long, default_value_t = 0.0)]
    pub fiducial_mdisk: f64,

    /// Override the field of view [arcsec].
    #[arg(long)]
    pub fov: Option<f64>,

    /// Override the image size [pixels].
    #[arg(long)]
    pub npix: Option<usize>,

    /// Override the source distance [pc].
    #[arg(long)]
    pub dist: Option<f64>,

    /// Override the channel padding.
    #[arg(long)]
    pub chpad: Option<usize>,

    /// Fix the spectral upsampling factor.
    #[arg(long)]
    pub nup: Option<usize>,

    /// Systemic velocity [m/s].
    #[arg(long, allow_hyphen_values = true)]
    pub vsyst: Option<f64>,
}

/// Options for `sgfit prob`.
#[derive(Debug, Args, Clone)]
pub struct ProbArgs {
    #[command(flatten)]
    pub data: DatasetArgs,

    /// Parameter vector, comma-separated, in prior-set order.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
    pub theta: Vec<f64>,
}

/// Options for `sgfit scan`.
#[derive(Debug, Args, Clone)]
pub struct ScanArgs {
    #[command(flatten)]
    pub data: DatasetArgs,

    /// Parameter to sweep (PA, stellar_mass, vturb, dust_param).
    #[arg(long)]
    pub param: String,

    /// Worker-pool size.
    #[arg(long, default_value_t = 32)]
    pub nthreads: usize,

    /// Directory for `<param>lnposterior.pdf`.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Terminal plot and export options.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export results to CSV, or JSON when the path ends in `.json`.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

/// Parse `lo,hi` into a velocity range.
pub fn parse_range(s: &str) -> Result<(f64, f64), String> {
    let (lo, hi) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `lo,hi`, got '{s}'"))?;
    let lo: f64 = lo.trim().parse().map_err(|_| format!("invalid number '{lo}'"))?;
    let hi: f64 = hi.trim().parse().map_err(|_| format!("invalid number '{hi}'"))?;
    if !(lo.is_finite() && hi.is_finite()) {
        return Err(format!("range bounds must be finite, got '{s}'"));
    }
    Ok((lo, hi))
}
