//! Formatted terminal output.
//!
//! Formatting lives here so engine and kernel code stay free of presentation
//! details, and output changes stay localized.

use crate::domain::{FitSettings, FixedConfig};
use crate::engine::ScanResult;
use crate::physics::{RotationField, RotationParams};
use crate::priors::PriorSpec;

/// Run header: model, prior set, dataset and resolved config.
pub fn format_run_header(settings: &FitSettings, prior: &PriorSpec, config: &FixedConfig) -> String {
    let mut out = String::new();
    out.push_str("=== sgfit - self-gravitating disk inference ===\n");
    out.push_str(&format!("Model: {} | prior set: {} (dim={})\n", settings.model_type, prior.name, prior.dim()));
    if let Some(dataset) = &settings.dataset {
        out.push_str(&format!("Dataset: {}\n", dataset.display()));
    }
    out.push_str(&format!(
        "Config: restfreq={:.6e} Hz | FOV={} | Npix={} | dist={} pc | chpad={} | Nup={} | doppcorr={:?} | SRF={:?}\n",
        config.restfreq,
        config.fov,
        config.npix,
        config.dist,
        config.chpad,
        config.nup.map(|n| n.to_string()).unwrap_or_else(|| "auto".to_string()),
        config.doppcorr,
        config.srf,
    ));
    out
}

/// Per-parameter breakdown of a log-probability evaluation.
pub fn format_probability(prior: &PriorSpec, theta: &[f64], ln_prob: f64) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<16} {:>14} {:>14}", "parameter", "value", "ln prior").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<16} {:-<14} {:-<14}", "", "", "").trim_end());
    out.push('\n');
    for ((p, &x), lp) in prior.params.iter().zip(theta).zip(prior.log_prior(theta)) {
        out.push_str(&format!("{:<16} {:>14.6} {:>14}\n", truncate(&p.name, 16), x, fmt_ln(lp)));
    }
    out.push_str(&format!("\nln P = {}\n", fmt_ln(ln_prob)));
    out
}

/// Scan summary: grid extent, best value, plot location.
pub fn format_scan_summary(scan: &ScanResult) -> String {
    let mut out = String::new();
    let finite = scan.ln_posteriors.iter().filter(|lp| lp.is_finite()).count();
    out.push_str(&format!("Scan: {} | n={} | finite={}\n", scan.param, scan.len(), finite));
    if let (Some(first), Some(last)) = (scan.values.first(), scan.values.last()) {
        out.push_str(&format!("Grid: [{first:.6}, {last:.6}]\n"));
    }
    match scan.best() {
        Some((x, lp)) => out.push_str(&format!("Best: {}={x:.6} (ln P={lp:.4})\n", scan.param)),
        None => out.push_str("Best: none (no finite log-posterior)\n"),
    }
    if let Some(path) = &scan.plot_path {
        out.push_str(&format!("Plot: {}\n", path.display()));
    }
    out
}

/// Rotation curve table with the squared-angular-velocity breakdown.
pub fn format_rotation_table(field: &RotationField, params: &RotationParams) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Mstar={} Msun | Mdisk={} Msun\n",
        params.stellar_mass, params.disk_mass
    ));
    out.push_str(
        format!(
            "{:>10} {:>12} {:>13} {:>13} {:>13}",
            "r [AU]", "v [km/s]", "Omega_K^2", "eps_P", "eps_g"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<12} {:-<13} {:-<13} {:-<13}", "", "", "", "", "").trim_end());
    out.push('\n');

    let c = &field.components;
    for i in 0..field.radius_au.len() {
        out.push_str(&format!(
            "{:>10.2} {:>12.4} {:>13.4e} {:>13.4e} {:>13.4e}\n",
            field.radius_au[i],
            field.velocity[i] / 1e3,
            c.keplerian[i],
            c.pressure[i],
            c.self_gravity[i],
        ));
    }
    out
}

fn fmt_ln(v: f64) -> String {
    if v == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{v:.6}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
