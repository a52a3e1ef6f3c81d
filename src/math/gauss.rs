//! Log-domain primitives for diagonal-covariance Gaussian emissions.
//!
//! All HMM arithmetic in this crate happens in log space:
//!
//! - emission densities underflow quickly for high-dimensional frames
//! - forward-algorithm sums over long sequences underflow even faster
//!
//! `log_sum_exp` is the one place where we leave log space, and it shifts by
//! the maximum first so the exponentials stay in range.

/// ln(2π).
const LN_2PI: f64 = 1.837_877_066_409_345_3;

/// Log-density of one frame under a diagonal Gaussian.
///
/// The three iterators must have equal length (the feature dimensionality);
/// variances are assumed positive (the fitter floors them).
pub fn diag_gaussian_log_density(
    x: impl Iterator<Item = f64>,
    mean: impl Iterator<Item = f64>,
    var: impl Iterator<Item = f64>,
) -> f64 {
    let mut acc = 0.0;
    for ((xi, mi), vi) in x.zip(mean).zip(var) {
        let d = xi - mi;
        acc += LN_2PI + vi.ln() + d * d / vi;
    }
    -0.5 * acc
}

/// Numerically stable `ln Σ exp(v_i)`.
///
/// Returns `f64::NEG_INFINITY` for an empty slice or a slice of all
/// `-∞` terms (the log of zero probability mass).
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY || !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}
