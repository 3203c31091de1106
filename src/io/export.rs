//! Export scans and rotation curves to CSV or JSON.
//!
//! The format follows the file extension: `.json` writes a self-describing JSON
//! document with a generation timestamp, anything else writes CSV.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::FixedConfig;
use crate::engine::ScanResult;
use crate::error::AppError;
use crate::physics::{RotationField, RotationParams};

const TOOL: &str = "sgfit";

#[derive(Debug, Serialize)]
struct ScanExport<'a> {
    tool: &'static str,
    generated_at: DateTime<Utc>,
    param: &'a str,
    config: &'a FixedConfig,
    best: Option<(f64, f64)>,
    values: &'a [f64],
    /// `null` for non-finite entries.
    ln_posteriors: Vec<Option<f64>>,
}

#[derive(Debug, Serialize)]
struct RotationExport<'a> {
    tool: &'static str,
    generated_at: DateTime<Utc>,
    params: &'a RotationParams,
    field: &'a RotationField,
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn create(path: &Path) -> Result<BufWriter<File>, AppError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| AppError::io(format!("Failed to create export '{}': {e}", path.display())))
}

fn write_err(path: &Path) -> impl Fn(std::io::Error) -> AppError + '_ {
    move |e| AppError::io(format!("Failed to write export '{}': {e}", path.display()))
}

/// Write a scan to `path`.
pub fn export_scan(path: &Path, scan: &ScanResult, config: &FixedConfig) -> Result<(), AppError> {
    let mut file = create(path)?;

    if is_json(path) {
        let doc = ScanExport {
            tool: TOOL,
            generated_at: Utc::now(),
            param: scan.param.name(),
            config,
            best: scan.best(),
            values: &scan.values,
            ln_posteriors: scan
                .ln_posteriors
                .iter()
                .map(|&lp| lp.is_finite().then_some(lp))
                .collect(),
        };
        serde_json::to_writer_pretty(&mut file, &doc)
            .map_err(|e| AppError::io(format!("Failed to write scan JSON: {e}")))?;
    } else {
        writeln!(file, "{},ln_posterior", scan.param.name()).map_err(write_err(path))?;
        for (x, lp) in scan.values.iter().zip(&scan.ln_posteriors) {
            writeln!(file, "{x:.10},{lp:.10}").map_err(write_err(path))?;
        }
    }

    file.flush().map_err(write_err(path))
}

/// Write a rotation curve and its component breakdown to `path`.
pub fn export_rotation(path: &Path, field: &RotationField, params: &RotationParams) -> Result<(), AppError> {
    let mut file = create(path)?;

    if is_json(path) {
        let doc = RotationExport {
            tool: TOOL,
            generated_at: Utc::now(),
            params,
            field,
        };
        serde_json::to_writer_pretty(&mut file, &doc)
            .map_err(|e| AppError::io(format!("Failed to write rotation JSON: {e}")))?;
    } else {
        writeln!(file, "radius_au,v_phi,omega_k_sq,eps_pressure,eps_self_gravity,omega_sq").map_err(write_err(path))?;
        let c = &field.components;
        for i in 0..field.radius_au.len() {
            writeln!(
                file,
                "{:.6},{:.6},{:.10e},{:.10e},{:.10e},{:.10e}",
                field.radius_au[i], field.velocity[i], c.keplerian[i], c.pressure[i], c.self_gravity[i], c.omega_sq[i],
            )
            .map_err(write_err(path))?;
        }
    }

    file.flush().map_err(write_err(path))
}
