//! CSV ingest for measured rotation curves.
//!
//! Expected columns (case-insensitive, any order):
//!
//! - `radius_au`: cylindrical radius [AU]
//! - `v_phi`: azimuthal velocity [m/s]
//! - `sigma`: 1-sigma velocity uncertainty [m/s]
//!
//! Bad rows are skipped and reported; a file with no usable row is an error.
//! Rows are sorted by radius on output.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::data::RotationCurveData;
use crate::error::AppError;

const REQUIRED_COLUMNS: [&str; 3] = ["radius_au", "v_phi", "sigma"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the clean curve plus what was dropped.
#[derive(Debug, Clone)]
pub struct IngestedCurve {
    pub curve: RotationCurveData,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl IngestedCurve {
    pub fn rows_used(&self) -> usize {
        self.curve.len()
    }
}

/// Load a rotation curve from CSV.
pub fn load_rotation_curve(path: &Path) -> Result<IngestedCurve, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open dataset '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::config(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !header_map.contains_key(*c))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::config(format!(
            "Dataset '{}' is missing required column(s): {}",
            path.display(),
            missing.join(", ")
        )));
    }

    let mut rows: Vec<(f64, f64, f64)> = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if rows.is_empty() {
        return Err(AppError::config(format!(
            "Dataset '{}' has no usable rows ({} read, {} rejected).",
            path.display(),
            rows_read,
            row_errors.len()
        )));
    }

    rows.sort_by(|a, b| a.0.total_cmp(&b.0));

    let curve = RotationCurveData {
        radius_au: rows.iter().map(|r| r.0).collect(),
        velocity: rows.iter().map(|r| r.1).collect(),
        sigma: rows.iter().map(|r| r.2).collect(),
    };

    Ok(IngestedCurve {
        curve,
        row_errors,
        rows_read,
    })
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<(f64, f64, f64), String> {
    let radius = parse_f64(get_required(record, header_map, "radius_au")?, "radius_au")?;
    let velocity = parse_f64(get_required(record, header_map, "v_phi")?, "v_phi")?;
    let sigma = parse_f64(get_required(record, header_map, "sigma")?, "sigma")?;

    if radius <= 0.0 {
        return Err(format!("radius_au must be positive, got {radius}"));
    }
    if sigma <= 0.0 {
        return Err(format!("sigma must be positive, got {sigma}"));
    }
    Ok((radius, velocity, sigma))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid number for `{name}`: '{s}'"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite value for `{name}`: '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_sorted_curve_and_reports_bad_rows() {
        let f = write_csv(
            "\u{feff}Radius_AU,v_phi,sigma\n\
             40,4600,80\n\
             10,9100,120\n\
             20,abc,100\n\
             30,5300,-1\n",
        );
        let ingested = load_rotation_curve(f.path()).unwrap();
        assert_eq!(ingested.rows_read, 4);
        assert_eq!(ingested.rows_used(), 2);
        assert_eq!(ingested.curve.radius_au, vec![10.0, 40.0]);
        assert_eq!(ingested.curve.velocity, vec![9100.0, 4600.0]);
        assert_eq!(ingested.row_errors.len(), 2);
        assert_eq!(ingested.row_errors[0].line, 4);
    }

    #[test]
    fn missing_column_is_config_error() {
        let f = write_csv("radius_au,v_phi\n10,9000\n");
        let err = load_rotation_curve(f.path()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
        assert!(err.message().contains("sigma"));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = load_rotation_curve(Path::new("/nonexistent/curve.csv")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
