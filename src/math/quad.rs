//! Trapezoidal quadrature and finite-difference gradients on sampled data.
//!
//! All routines take the sample coordinates explicitly, so non-uniform grids
//! (the kernel's logarithmic height and source-radius grids) are handled exactly
//! the way `numpy.trapz`, `scipy.integrate.cumtrapz` and `numpy.gradient` do.

/// Trapezoidal integral of `y(x)`.
///
/// # Panics
/// Panics if `y` and `x` differ in length.
pub fn trapz(y: &[f64], x: &[f64]) -> f64 {
    assert_eq!(y.len(), x.len(), "trapz: y and x must have equal length");
    y.windows(2)
        .zip(x.windows(2))
        .map(|(yy, xx)| 0.5 * (yy[0] + yy[1]) * (xx[1] - xx[0]))
        .sum()
}

/// Cumulative trapezoidal integral with an initial value of zero.
///
/// The output has the same length as the input.
pub fn cumtrapz(y: &[f64], x: &[f64]) -> Vec<f64> {
    assert_eq!(y.len(), x.len(), "cumtrapz: y and x must have equal length");
    let mut out = Vec::with_capacity(y.len());
    if y.is_empty() {
        return out;
    }
    let mut acc = 0.0;
    out.push(acc);
    for i in 1..y.len() {
        acc += 0.5 * (y[i] + y[i - 1]) * (x[i] - x[i - 1]);
        out.push(acc);
    }
    out
}

/// Gradient `dy/dx` on a possibly non-uniform grid.
///
/// Interior points use the second-order accurate three-point formula; the two
/// edges use first-order one-sided differences.
pub fn gradient(y: &[f64], x: &[f64]) -> Vec<f64> {
    assert_eq!(y.len(), x.len(), "gradient: y and x must have equal length");
    let n = y.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let mut out = vec![0.0; n];
    out[0] = (y[1] - y[0]) / (x[1] - x[0]);
    out[n - 1] = (y[n - 1] - y[n - 2]) / (x[n - 1] - x[n - 2]);

    for i in 1..n - 1 {
        let hs = x[i] - x[i - 1];
        let hd = x[i + 1] - x[i];
        out[i] = (hs * hs * y[i + 1] + (hd * hd - hs * hs) * y[i] - hd * hd * y[i - 1])
            / (hs * hd * (hd + hs));
    }
    out
}

/// Forward differences `dy/dx`, with the last interval repeated so the output
/// keeps the input length.
pub fn forward_diff(y: &[f64], x: &[f64]) -> Vec<f64> {
    assert_eq!(y.len(), x.len(), "forward_diff: y and x must have equal length");
    let n = y.len();
    if n < 2 {
        return vec![0.0; n];
    }
    let mut out: Vec<f64> = y
        .windows(2)
        .zip(x.windows(2))
        .map(|(yy, xx)| (yy[1] - yy[0]) / (xx[1] - xx[0]))
        .collect();
    out.push(out[n - 2]);
    out
}
