//! One-dimensional linear interpolation with linear extrapolation.

/// Linearly interpolate `ys(xs)` at `x`.
///
/// `xs` must be strictly increasing with at least two points. Outside the sampled
/// range the first or last segment is extended, which matches
/// `scipy.interpolate.interp1d(..., fill_value="extrapolate")`.
pub fn interp_linear(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len();
    match n {
        0 => return f64::NAN,
        1 => return ys[0],
        _ => {}
    }

    // Index of the segment's right endpoint, clamped so edge segments extrapolate.
    let hi = xs.partition_point(|&v| v < x).clamp(1, n - 1);
    let lo = hi - 1;

    let (x0, x1) = (xs[lo], xs[hi]);
    let (y0, y1) = (ys[lo], ys[hi]);
    if (x1 - x0).abs() < f64::EPSILON * x0.abs().max(1.0) {
        return y0;
    }
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

/// Interpolate at many points.
pub fn interp_linear_many(xs: &[f64], ys: &[f64], at: &[f64]) -> Vec<f64> {
    at.iter().map(|&x| interp_linear(xs, ys, x)).collect()
}
