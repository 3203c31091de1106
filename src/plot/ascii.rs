//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid, deterministic output.
//!
//! Plot elements:
//! - series: `-` line through consecutive finite points, `o` at each point
//! - best point of a scan: `*`

use crate::engine::ScanResult;
use crate::physics::RotationField;

/// Render a brute-force scan: log-posterior against the swept value.
pub fn render_scan_ascii(scan: &ScanResult, width: usize, height: usize) -> String {
    let series: Vec<(f64, f64)> = scan
        .values
        .iter()
        .copied()
        .zip(scan.ln_posteriors.iter().copied())
        .collect();
    let highlight = scan.best();
    render_plot(&series, highlight, scan.param.name(), "ln P", width, height)
}

/// Render a rotation curve: velocity [km/s] against radius [AU].
pub fn render_rotation_ascii(field: &RotationField, width: usize, height: usize) -> String {
    let series: Vec<(f64, f64)> = field
        .radius_au
        .iter()
        .zip(&field.velocity)
        .map(|(&r, &v)| (r, v / 1e3))
        .collect();
    render_plot(&series, None, "r [AU]", "v_phi [km/s]", width, height)
}

fn render_plot(
    series: &[(f64, f64)],
    highlight: Option<(f64, f64)>,
    x_label: &str,
    y_label: &str,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let finite: Vec<(f64, f64)> = series
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();

    let mut out = String::new();
    let Some(((x_min, x_max), (y_min, y_max))) = ranges(&finite) else {
        out.push_str(&format!("Plot: {y_label} vs {x_label} | no finite points\n"));
        return out;
    };
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Lines first so markers overlay them; gaps where values are non-finite.
    let mut prev: Option<(usize, usize)> = None;
    for &(x, y) in series {
        if !(x.is_finite() && y.is_finite()) {
            prev = None;
            continue;
        }
        let cell = (map_x(x, x_min, x_max, width), map_y(y, y_min, y_max, height));
        if let Some((x0, y0)) = prev {
            draw_line(&mut grid, x0, y0, cell.0, cell.1, '-');
        }
        prev = Some(cell);
    }

    for &(x, y) in &finite {
        grid[map_y(y, y_min, y_max, height)][map_x(x, x_min, x_max, width)] = 'o';
    }
    if let Some((x, y)) = highlight {
        grid[map_y(y, y_min, y_max, height)][map_x(x, x_min, x_max, width)] = '*';
    }

    out.push_str(&format!(
        "Plot: {x_label}=[{x_min:.3}, {x_max:.3}] | {y_label}=[{y_min:.3}, {y_max:.3}]\n"
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out
}

fn ranges(points: &[(f64, f64)]) -> Option<((f64, f64), (f64, f64))> {
    let first = points.first()?;
    let mut x = (first.0, first.0);
    let mut y = (first.1, first.1);
    for &(px, py) in points {
        x = (x.0.min(px), x.1.max(px));
        y = (y.0.min(py), y.1.max(py));
    }
    if x.1 <= x.0 {
        x = (x.0 - 0.5, x.1 + 0.5);
    }
    Some((x, y))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
            grid[y0 as usize][x0 as usize] = ch;
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
