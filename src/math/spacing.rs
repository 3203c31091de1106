//! Evenly spaced grids.
//!
//! Endpoints are inclusive, matching `numpy.linspace` / `numpy.logspace`.

/// `n` evenly spaced values from `start` to `stop` (inclusive).
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n as f64 - 1.0);
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            // Pin the last point so accumulated rounding never moves the endpoint.
            out[n - 1] = stop;
            out
        }
    }
}

/// `n` values spaced evenly in `log10` between `10^start_exp` and `10^stop_exp`.
pub fn logspace(start_exp: f64, stop_exp: f64, n: usize) -> Vec<f64> {
    linspace(start_exp, stop_exp, n)
        .into_iter()
        .map(|e| 10f64.powf(e))
        .collect()
}
