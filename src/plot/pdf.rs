//! PDF output for scan plots.
//!
//! Plotters has no PDF backend, so charts are drawn to SVG in memory and
//! converted with `svg2pdf`. Text is laid out with the system fonts; on a host
//! without fonts the labels are dropped but the curves still render.

use std::fs;
use std::path::Path;

use svg2pdf::usvg;

use crate::engine::ScanResult;
use crate::error::AppError;
use crate::plot::svg::scan_svg;

/// Convert an SVG document into a single-page PDF.
pub fn svg_to_pdf(svg: &str) -> Result<Vec<u8>, AppError> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &options)
        .map_err(|e| AppError::io(format!("Failed to parse rendered SVG: {e}")))?;
    svg2pdf::to_pdf(&tree, svg2pdf::ConversionOptions::default(), svg2pdf::PageOptions::default())
        .map_err(|e| AppError::io(format!("Failed to convert plot to PDF: {e:?}")))
}

/// Write the log-posterior plot of `scan` as a PDF.
pub fn write_scan_pdf(scan: &ScanResult, path: &Path) -> Result<(), AppError> {
    let pdf = svg_to_pdf(&scan_svg(scan)?)?;
    fs::write(path, pdf).map_err(|e| AppError::io(format!("Failed to write plot '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GridParam;

    #[test]
    fn scan_plot_is_written_as_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PAlnposterior.pdf");
        let scan = ScanResult {
            param: GridParam::Pa,
            values: vec![0.0, 1.0, 2.0, 3.0],
            ln_posteriors: vec![-4.0, -1.0, f64::NEG_INFINITY, -2.5],
            plot_path: None,
        };
        write_scan_pdf(&scan, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn malformed_svg_is_io_error() {
        let err = svg_to_pdf("<not-svg").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }
}
