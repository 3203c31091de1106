//! Vector plots rendered with Plotters' SVG backend.
//!
//! Charts are rendered into a string first so the same drawing can be written
//! as SVG or handed to [`crate::plot::pdf`]. Series are data-driven: bounds are
//! computed before drawing, non-finite values are dropped, and a degenerate range
//! is widened so the chart always builds.

use std::error::Error;
use std::fs;
use std::path::Path;

use plotters::prelude::*;

use crate::engine::ScanResult;
use crate::error::AppError;
use crate::physics::RotationField;

const SIZE: (u32, u32) = (800, 600);

/// Render the log-posterior of a scan against the swept value.
pub fn scan_svg(scan: &ScanResult) -> Result<String, AppError> {
    let points = finite_points(scan.values.iter().copied().zip(scan.ln_posteriors.iter().copied()));
    let title = format!("Log posterior as a function of {}", scan.param);
    let series = [Series {
        label: "ln P",
        color: RGBColor(31, 119, 180),
        points: &points,
    }];
    draw_chart(&title, scan.param.name(), "ln posterior", &series, scan.best())
        .map_err(|e| AppError::io(format!("Failed to render scan plot for {}: {e}", scan.param)))
}

/// Render a rotation curve [km/s] with its Keplerian-only counterpart.
pub fn rotation_svg(field: &RotationField) -> Result<String, AppError> {
    let total = finite_points(field.radius_au.iter().copied().zip(field.velocity.iter().map(|v| v / 1e3)));
    let keplerian = finite_points(
        field
            .radius_au
            .iter()
            .zip(&field.components.keplerian)
            .map(|(&r, &w2)| (r, r * crate::physics::constants::AU * w2.max(0.0).sqrt() / 1e3)),
    );
    let series = [
        Series {
            label: "v_phi",
            color: RGBColor(31, 119, 180),
            points: &total,
        },
        Series {
            label: "Keplerian",
            color: RGBColor(127, 127, 127),
            points: &keplerian,
        },
    ];
    draw_chart("Rotation curve", "r [AU]", "v_phi [km/s]", &series, None)
        .map_err(|e| AppError::io(format!("Failed to render rotation plot: {e}")))
}

/// Write [`rotation_svg`] to `path`.
pub fn write_rotation_svg(field: &RotationField, path: &Path) -> Result<(), AppError> {
    let svg = rotation_svg(field)?;
    fs::write(path, svg).map_err(|e| AppError::io(format!("Failed to write plot '{}': {e}", path.display())))
}

struct Series<'a> {
    label: &'a str,
    color: RGBColor,
    points: &'a [(f64, f64)],
}

fn finite_points(it: impl Iterator<Item = (f64, f64)>) -> Vec<(f64, f64)> {
    it.filter(|(x, y)| x.is_finite() && y.is_finite()).collect()
}

fn bounds(series: &[Series<'_>]) -> ([f64; 2], [f64; 2]) {
    let mut x = [f64::INFINITY, f64::NEG_INFINITY];
    let mut y = [f64::INFINITY, f64::NEG_INFINITY];
    for &(px, py) in series.iter().flat_map(|s| s.points.iter()) {
        x = [x[0].min(px), x[1].max(px)];
        y = [y[0].min(py), y[1].max(py)];
    }
    (widen(x), widen(y))
}

fn widen(range: [f64; 2]) -> [f64; 2] {
    let [lo, hi] = range;
    if !(lo.is_finite() && hi.is_finite()) {
        return [0.0, 1.0];
    }
    let span = hi - lo;
    if span <= 0.0 {
        let pad = (lo.abs() * 0.05).max(0.5);
        return [lo - pad, hi + pad];
    }
    [lo - 0.05 * span, hi + 0.05 * span]
}

fn draw_chart(
    title: &str,
    x_desc: &str,
    y_desc: &str,
    series: &[Series<'_>],
    highlight: Option<(f64, f64)>,
) -> Result<String, Box<dyn Error>> {
    let ([x0, x1], [y0, y1]) = bounds(series);
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 22))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(x0..x1, y0..y1)?;

        chart
            .configure_mesh()
            .x_desc(x_desc)
            .y_desc(y_desc)
            .x_labels(8)
            .y_labels(8)
            .draw()?;

        for s in series {
            let color = s.color;
            chart
                .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))?
                .label(s.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        if let Some(point) = highlight {
            chart.draw_series(std::iter::once(Circle::new(point, 4, RED.filled())))?;
        }

        if series.len() > 1 {
            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()?;
        }

        root.present()?;
    }
    Ok(svg)
}
