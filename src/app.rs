//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - loads `.env` and initialises logging
//! - parses CLI arguments
//! - runs the kernel or the inference pipeline
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Cli, Command, DatasetArgs, ProbArgs, ScanArgs, VphiArgs};
use crate::domain::{ConfigOverrides, FitSettings};
use crate::error::AppError;
use crate::math::linspace;
use crate::physics::{RotationCurveSolver, RotationParams};

pub mod pipeline;

/// Entry point for the `sgfit` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Vphi(args) => handle_vphi(args),
        Command::Prob(args) => handle_prob(args),
        Command::Scan(args) => handle_scan(args),
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .try_init();
}

fn handle_vphi(args: VphiArgs) -> Result<(), AppError> {
    if !(args.r_min > 0.0 && args.r_max > args.r_min) || args.count < 2 {
        return Err(AppError::config(format!(
            "Invalid radius grid: r_min={}, r_max={}, n={} (need 0 < r_min < r_max and n >= 2).",
            args.r_min, args.r_max, args.count
        )));
    }

    let params = RotationParams::new(args.mstar, args.mdisk);
    let radii = linspace(args.r_min, args.r_max, args.count);
    log::info!("Solving rotation curve at {} radii", radii.len());
    let field = RotationCurveSolver::default().solve(&radii, &params);

    println!("{}", crate::report::format_rotation_table(&field, &params));
    if !args.output.no_plot {
        println!(
            "{}",
            crate::plot::render_rotation_ascii(&field, args.output.width, args.output.height)
        );
    }

    if let Some(path) = &args.output.export {
        crate::io::export_rotation(path, &field, &params)?;
    }
    if let Some(path) = &args.svg {
        crate::plot::write_rotation_svg(&field, path)?;
    }
    Ok(())
}

fn handle_prob(args: ProbArgs) -> Result<(), AppError> {
    let (settings, fiducial) = fit_settings_from_args(&args.data);
    let session = pipeline::open_session(settings, fiducial)?;
    let ln_prob = session.probability(&args.theta)?;

    let controller = &session.controller;
    println!(
        "{}",
        crate::report::format_run_header(controller.settings(), controller.prior(), controller.config())
    );
    println!("{}", crate::report::format_probability(controller.prior(), &args.theta, ln_prob));
    Ok(())
}

fn handle_scan(args: ScanArgs) -> Result<(), AppError> {
    let (mut settings, fiducial) = fit_settings_from_args(&args.data);
    settings.nthreads = args.nthreads;
    settings.output_dir = args.output_dir.clone();

    let session = pipeline::open_session(settings, fiducial)?;
    let controller = &session.controller;
    println!(
        "{}",
        crate::report::format_run_header(controller.settings(), controller.prior(), controller.config())
    );

    let Some(scan) = session.scan(&args.param)? else {
        println!("No brute-force grid for parameter '{}'; nothing to do.", args.param);
        return Ok(());
    };

    println!("{}", crate::report::format_scan_summary(&scan));
    if !args.output.no_plot {
        println!(
            "{}",
            crate::plot::render_scan_ascii(&scan, args.output.width, args.output.height)
        );
    }
    if let Some(path) = &args.output.export {
        crate::io::export_scan(path, &scan, controller.config())?;
    }
    Ok(())
}

/// Map dataset flags to `FitSettings` plus the model's fiducial parameters.
pub fn fit_settings_from_args(args: &DatasetArgs) -> (FitSettings, RotationParams) {
    let defaults = FitSettings::default();
    let settings = FitSettings {
        dataset: Some(args.dataset.clone()),
        model_type: args.model_type,
        param_set: args.param_set.clone(),
        vra: args.vra,
        vcensor: args.vcensor.clone(),
        vsyst: args.vsyst,
        nu_rest: args.nu_rest,
        nwalk: args.nwalk,
        seed: args.seed,
        overrides: ConfigOverrides {
            fov: args.fov,
            npix: args.npix,
            dist: args.dist,
            chpad: args.chpad,
            nup: args.nup.map(Some),
            ..ConfigOverrides::default()
        },
        ..defaults
    };
    let fiducial = RotationParams::new(args.fiducial_mstar, args.fiducial_mdisk);
    (settings, fiducial)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_flags_become_overrides() {
        let cli = Cli::parse_from([
            "sgfit", "prob", "curve.csv", "--theta", "0.5", "--param-set", "stellar_mass", "--npix", "512", "--nup", "3",
        ]);
        let Command::Prob(args) = cli.command else {
            panic!("expected prob");
        };
        let (settings, fiducial) = fit_settings_from_args(&args.data);
        assert_eq!(settings.prior_name(), "VEXACT_stellar_mass");
        assert_eq!(settings.overrides.npix, Some(512));
        assert_eq!(settings.overrides.nup, Some(Some(3)));
        assert_eq!(settings.overrides.fov, None);
        let cfg = settings.fixed_config();
        assert_eq!(cfg.npix, 512);
        assert_eq!(cfg.nup, Some(3));
        assert_eq!(fiducial, RotationParams::new(0.5, 0.0));
    }
}
