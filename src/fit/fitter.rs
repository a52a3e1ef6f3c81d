//! Baum-Welch (EM) fitting of a diagonal-covariance Gaussian HMM.
//!
//! Given a concatenated feature matrix and per-sequence lengths, we:
//!
//! - initialize deterministically from a seeded RNG (uniform start/transition
//!   distributions, means drawn from distinct training frames, variances from
//!   the global per-dimension variance)
//! - iterate E/M steps until the log-likelihood delta drops below `tol` or
//!   the iteration cap is hit
//! - floor every variance at `min_covar` so emissions cannot collapse onto a
//!   single frame
//!
//! All recursions run in log space; posteriors are exponentiated only when
//! accumulating sufficient statistics.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::SelectConfig;
use crate::error::AppError;
use crate::math::log_sum_exp;
use crate::models::GaussianHmm;

/// Posterior mass below which a state's emission parameters are left alone
/// during the M-step (re-estimating from ~zero mass is pure noise).
const POSTERIOR_EPS: f64 = 1e-10;

/// Options that affect how a single model is fit.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// EM iteration cap.
    pub n_iter: usize,
    /// Convergence tolerance on the log-likelihood delta.
    pub tol: f64,
    /// Floor for per-dimension emission variances.
    pub min_covar: f64,
    /// RNG seed for initialization.
    pub seed: u64,
}

impl FitOptions {
    pub fn from_config(config: &SelectConfig) -> Self {
        Self {
            n_iter: config.n_iter,
            tol: config.tol,
            min_covar: config.min_covar,
            seed: config.random_state,
        }
    }
}

/// A fitted model plus fit diagnostics.
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub hmm: GaussianHmm,
    /// Log-likelihood of the training data under the final parameters.
    pub log_likelihood: f64,
    /// EM iterations actually run.
    pub iterations: usize,
    /// Whether the tolerance stop fired before the iteration cap.
    pub converged: bool,
}

/// Fit a Gaussian HMM with `n_states` hidden states.
pub fn fit_gaussian_hmm(
    x: &DMatrix<f64>,
    lengths: &[usize],
    n_states: usize,
    opts: &FitOptions,
) -> Result<FittedModel, AppError> {
    if n_states == 0 {
        return Err(AppError::config("State count must be >= 1."));
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(AppError::data("No training frames to fit."));
    }
    let total: usize = lengths.iter().sum();
    if total != x.nrows() || lengths.iter().any(|&l| l == 0) {
        return Err(AppError::config(format!(
            "Sequence lengths {lengths:?} do not partition {} frames.",
            x.nrows()
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(AppError::data("Training data contains non-finite values."));
    }
    if x.nrows() < n_states {
        return Err(AppError::data(format!(
            "Cannot fit {n_states} states to {} frame(s).",
            x.nrows()
        )));
    }

    let mut model = init_model(x, n_states, opts);
    let mut prev_ll: Option<f64> = None;
    let mut iterations = 0;
    let mut converged = false;

    for _ in 0..opts.n_iter {
        let (ll, stats) = e_step(&model, x, lengths)?;
        m_step(&mut model, &stats, opts.min_covar);
        iterations += 1;

        if let Some(prev) = prev_ll {
            if ll - prev < opts.tol {
                converged = true;
                break;
            }
        }
        prev_ll = Some(ll);
    }

    // Score under the *final* parameters (the last M-step ran after the last
    // measured log-likelihood).
    let log_likelihood = model.score(x, lengths)?;
    if !log_likelihood.is_finite() {
        return Err(AppError::numeric("Fitted model has degenerate likelihood."));
    }

    Ok(FittedModel {
        hmm: model,
        log_likelihood,
        iterations,
        converged,
    })
}

/// Seeded deterministic initialization.
fn init_model(x: &DMatrix<f64>, n_states: usize, opts: &FitOptions) -> GaussianHmm {
    let n_frames = x.nrows();
    let d = x.ncols();
    let mut rng = StdRng::seed_from_u64(opts.seed);

    // Means: distinct random training frames.
    let picks = rand::seq::index::sample(&mut rng, n_frames, n_states).into_vec();
    let mut means = DMatrix::zeros(n_states, d);
    for (i, &frame) in picks.iter().enumerate() {
        means.row_mut(i).copy_from(&x.row(frame));
    }

    // Variances: global per-dimension variance, floored.
    let mut covars = DMatrix::zeros(n_states, d);
    for j in 0..d {
        let col = x.column(j);
        let mean = col.sum() / n_frames as f64;
        let var = col.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n_frames as f64;
        let var = var.max(opts.min_covar);
        for i in 0..n_states {
            covars[(i, j)] = var;
        }
    }

    let uniform = 1.0 / n_states as f64;
    GaussianHmm {
        startprob: DVector::from_element(n_states, uniform),
        transmat: DMatrix::from_element(n_states, n_states, uniform),
        means,
        covars,
    }
}

/// Accumulated expected sufficient statistics for one E-step.
struct SufficientStats {
    start: DVector<f64>,
    trans: DMatrix<f64>,
    post: DVector<f64>,
    obs: DMatrix<f64>,
    obs_sq: DMatrix<f64>,
}

fn e_step(
    model: &GaussianHmm,
    x: &DMatrix<f64>,
    lengths: &[usize],
) -> Result<(f64, SufficientStats), AppError> {
    let n = model.n_states();
    let d = model.n_features();
    let log_start = model.startprob.map(|v| v.ln());
    let log_trans = model.transmat.map(|v| v.ln());

    let mut stats = SufficientStats {
        start: DVector::zeros(n),
        trans: DMatrix::zeros(n, n),
        post: DVector::zeros(n),
        obs: DMatrix::zeros(n, d),
        obs_sq: DMatrix::zeros(n, d),
    };
    let mut total_ll = 0.0;

    let mut offset = 0;
    for &len in lengths {
        let seq = x.rows(offset, len).into_owned();
        let logb = model.log_emissions(&seq);

        let (log_alpha, ll) = forward(&log_start, &log_trans, &logb);
        if !ll.is_finite() {
            return Err(AppError::numeric(
                "Log-likelihood diverged during the E-step.",
            ));
        }
        let log_beta = backward(&log_trans, &logb);
        total_ll += ll;

        // State posteriors.
        for t in 0..len {
            for i in 0..n {
                let g = (log_alpha[(t, i)] + log_beta[(t, i)] - ll).exp();
                stats.post[i] += g;
                if t == 0 {
                    stats.start[i] += g;
                }
                for j in 0..d {
                    let v = seq[(t, j)];
                    stats.obs[(i, j)] += g * v;
                    stats.obs_sq[(i, j)] += g * v * v;
                }
            }
        }

        // Transition posteriors.
        for t in 0..len.saturating_sub(1) {
            for i in 0..n {
                for j in 0..n {
                    let v = (log_alpha[(t, i)]
                        + log_trans[(i, j)]
                        + logb[(t + 1, j)]
                        + log_beta[(t + 1, j)]
                        - ll)
                        .exp();
                    stats.trans[(i, j)] += v;
                }
            }
        }

        offset += len;
    }

    Ok((total_ll, stats))
}

fn m_step(model: &mut GaussianHmm, stats: &SufficientStats, min_covar: f64) {
    let n = model.n_states();
    let d = model.n_features();
    let uniform = 1.0 / n as f64;

    let start_total = stats.start.sum();
    if start_total > 0.0 {
        model.startprob = &stats.start / start_total;
    } else {
        model.startprob = DVector::from_element(n, uniform);
    }

    for i in 0..n {
        let row_sum: f64 = stats.trans.row(i).sum();
        if row_sum > 0.0 {
            for j in 0..n {
                model.transmat[(i, j)] = stats.trans[(i, j)] / row_sum;
            }
        } else {
            // State never transitions out (absorbing or unvisited).
            for j in 0..n {
                model.transmat[(i, j)] = uniform;
            }
        }
    }

    for i in 0..n {
        let p = stats.post[i];
        if p <= POSTERIOR_EPS {
            continue;
        }
        for j in 0..d {
            let mean = stats.obs[(i, j)] / p;
            let var = (stats.obs_sq[(i, j)] / p - mean * mean).max(min_covar);
            model.means[(i, j)] = mean;
            model.covars[(i, j)] = var;
        }
    }
}

/// Log-domain forward recursion; returns the full `T × n` table and the
/// sequence log-likelihood.
fn forward(
    log_start: &DVector<f64>,
    log_trans: &DMatrix<f64>,
    logb: &DMatrix<f64>,
) -> (DMatrix<f64>, f64) {
    let tt = logb.nrows();
    let n = logb.ncols();
    let mut log_alpha = DMatrix::zeros(tt, n);
    let mut work = vec![0.0; n];

    for i in 0..n {
        log_alpha[(0, i)] = log_start[i] + logb[(0, i)];
    }
    for t in 1..tt {
        for j in 0..n {
            for i in 0..n {
                work[i] = log_alpha[(t - 1, i)] + log_trans[(i, j)];
            }
            log_alpha[(t, j)] = log_sum_exp(&work) + logb[(t, j)];
        }
    }

    let last: Vec<f64> = (0..n).map(|i| log_alpha[(tt - 1, i)]).collect();
    let ll = log_sum_exp(&last);
    (log_alpha, ll)
}

/// Log-domain backward recursion (`T × n` table).
fn backward(log_trans: &DMatrix<f64>, logb: &DMatrix<f64>) -> DMatrix<f64> {
    let tt = logb.nrows();
    let n = logb.ncols();
    let mut log_beta = DMatrix::zeros(tt, n);
    let mut work = vec![0.0; n];

    // log_beta[T-1][*] = ln 1 = 0.
    for t in (0..tt.saturating_sub(1)).rev() {
        for i in 0..n {
            for j in 0..n {
                work[j] = log_trans[(i, j)] + logb[(t + 1, j)] + log_beta[(t + 1, j)];
            }
            log_beta[(t, i)] = log_sum_exp(&work);
        }
    }
    log_beta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(seed: u64) -> FitOptions {
        FitOptions {
            n_iter: 100,
            tol: 1e-2,
            min_covar: 1e-3,
            seed,
        }
    }

    /// Two well-separated clusters visited in order, 1-d.
    fn two_regime_data() -> (DMatrix<f64>, Vec<usize>) {
        let mut values = Vec::new();
        for i in 0..10 {
            values.push(-5.0 + 0.05 * i as f64);
        }
        for i in 0..10 {
            values.push(5.0 - 0.05 * i as f64);
        }
        (DMatrix::from_row_slice(20, 1, &values), vec![20])
    }

    #[test]
    fn same_seed_gives_identical_log_likelihood() {
        let (x, lengths) = two_regime_data();
        let a = fit_gaussian_hmm(&x, &lengths, 3, &opts(14)).unwrap();
        let b = fit_gaussian_hmm(&x, &lengths, 3, &opts(14)).unwrap();
        assert_eq!(a.log_likelihood, b.log_likelihood);
        assert_eq!(a.iterations, b.iterations);
    }

    #[test]
    fn more_iterations_never_hurt_the_likelihood() {
        let (x, lengths) = two_regime_data();
        let short = fit_gaussian_hmm(
            &x,
            &lengths,
            2,
            &FitOptions {
                n_iter: 1,
                ..opts(14)
            },
        )
        .unwrap();
        let long = fit_gaussian_hmm(&x, &lengths, 2, &opts(14)).unwrap();
        assert!(long.log_likelihood >= short.log_likelihood - 1e-9);
    }

    #[test]
    fn single_state_fit_recovers_sample_moments() {
        // With one state every posterior is 1, so EM reduces to the sample
        // mean/variance regardless of the seed.
        let x = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
        let fit = fit_gaussian_hmm(&x, &[4], 1, &opts(7)).unwrap();

        assert!((fit.hmm.means[(0, 0)] - 2.5).abs() < 1e-9);
        assert!((fit.hmm.covars[(0, 0)] - 1.25).abs() < 1e-9);
    }

    #[test]
    fn converges_on_easy_data() {
        let (x, lengths) = two_regime_data();
        let fit = fit_gaussian_hmm(&x, &lengths, 2, &opts(14)).unwrap();
        assert!(fit.converged, "expected convergence, ran {} iters", fit.iterations);
        assert!(fit.iterations < 100);
    }

    #[test]
    fn transition_rows_stay_stochastic() {
        let (x, lengths) = two_regime_data();
        let fit = fit_gaussian_hmm(&x, &lengths, 3, &opts(14)).unwrap();
        for i in 0..3 {
            let row_sum: f64 = fit.hmm.transmat.row(i).sum();
            assert!((row_sum - 1.0).abs() < 1e-9, "row {i} sums to {row_sum}");
        }
        let start_sum: f64 = fit.hmm.startprob.sum();
        assert!((start_sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_more_states_than_frames() {
        let x = DMatrix::from_row_slice(2, 1, &[0.0, 1.0]);
        let err = fit_gaussian_hmm(&x, &[2], 5, &opts(1)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn rejects_non_finite_data() {
        let x = DMatrix::from_row_slice(2, 1, &[0.0, f64::NAN]);
        let err = fit_gaussian_hmm(&x, &[2], 1, &opts(1)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn rejects_bad_lengths() {
        let x = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 2.0]);
        let err = fit_gaussian_hmm(&x, &[2], 1, &opts(1)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
