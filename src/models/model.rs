//! Diagonal-covariance Gaussian HMM and log-likelihood scoring.
//!
//! A model holds:
//! - `startprob`: the initial state distribution (length `n`)
//! - `transmat`: the row-stochastic transition matrix (`n × n`)
//! - `means` / `covars`: per-state emission means and diagonal variances
//!   (`n × d`, one row per state)
//!
//! Scoring runs the forward algorithm entirely in log space, which is slower
//! than scaled linear-space recursions but immune to underflow and simple to
//! audit. Candidate counts here are tiny (n ≤ 10), so this is not a
//! bottleneck.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;
use crate::math::{diag_gaussian_log_density, log_sum_exp};

#[derive(Debug, Clone)]
pub struct GaussianHmm {
    pub startprob: DVector<f64>,
    pub transmat: DMatrix<f64>,
    pub means: DMatrix<f64>,
    pub covars: DMatrix<f64>,
}

impl GaussianHmm {
    pub fn n_states(&self) -> usize {
        self.startprob.len()
    }

    pub fn n_features(&self) -> usize {
        self.means.ncols()
    }

    /// Log emission densities for one sequence: entry `(t, i)` is the
    /// log-density of frame `t` under state `i`.
    pub(crate) fn log_emissions(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        let tt = x.nrows();
        let n = self.n_states();
        let mut out = DMatrix::zeros(tt, n);
        for t in 0..tt {
            for i in 0..n {
                out[(t, i)] = diag_gaussian_log_density(
                    x.row(t).iter().copied(),
                    self.means.row(i).iter().copied(),
                    self.covars.row(i).iter().copied(),
                );
            }
        }
        out
    }

    /// Total log-likelihood of one or more sequences.
    ///
    /// `x` is the row-wise concatenation of the sequences and `lengths` gives
    /// the frame count of each; the lengths must sum to `x.nrows()`.
    pub fn score(&self, x: &DMatrix<f64>, lengths: &[usize]) -> Result<f64, AppError> {
        if x.ncols() != self.n_features() {
            return Err(AppError::config(format!(
                "Feature dimensionality mismatch: data has {}, model has {}.",
                x.ncols(),
                self.n_features()
            )));
        }
        let total: usize = lengths.iter().sum();
        if total != x.nrows() || lengths.iter().any(|&l| l == 0) {
            return Err(AppError::config(format!(
                "Sequence lengths {lengths:?} do not partition {} frames.",
                x.nrows()
            )));
        }

        let log_trans = self.transmat.map(|v| v.ln());
        let mut ll = 0.0;
        let mut offset = 0;
        for &len in lengths {
            let seq = x.rows(offset, len).into_owned();
            ll += self.score_sequence(&seq, &log_trans)?;
            offset += len;
        }
        Ok(ll)
    }

    /// Forward algorithm over a single sequence (log domain).
    fn score_sequence(
        &self,
        seq: &DMatrix<f64>,
        log_trans: &DMatrix<f64>,
    ) -> Result<f64, AppError> {
        let n = self.n_states();
        let tt = seq.nrows();
        let logb = self.log_emissions(seq);

        let mut alpha: Vec<f64> = (0..n)
            .map(|i| self.startprob[i].ln() + logb[(0, i)])
            .collect();
        let mut work = vec![0.0; n];

        for t in 1..tt {
            let mut next = vec![f64::NEG_INFINITY; n];
            for (j, slot) in next.iter_mut().enumerate() {
                for i in 0..n {
                    work[i] = alpha[i] + log_trans[(i, j)];
                }
                *slot = log_sum_exp(&work) + logb[(t, j)];
            }
            alpha = next;
        }

        let ll = log_sum_exp(&alpha);
        if ll.is_nan() || ll == f64::INFINITY {
            return Err(AppError::numeric(
                "Non-finite log-likelihood in forward pass.",
            ));
        }
        Ok(ll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_state_model(mean: f64, var: f64) -> GaussianHmm {
        GaussianHmm {
            startprob: DVector::from_row_slice(&[1.0]),
            transmat: DMatrix::from_row_slice(1, 1, &[1.0]),
            means: DMatrix::from_row_slice(1, 1, &[mean]),
            covars: DMatrix::from_row_slice(1, 1, &[var]),
        }
    }

    #[test]
    fn single_state_score_is_iid_gaussian_log_likelihood() {
        let model = single_state_model(0.0, 1.0);
        let x = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, -1.0]);

        let got = model.score(&x, &[3]).unwrap();
        let expected: f64 = [0.0_f64, 1.0, -1.0]
            .iter()
            .map(|&v| {
                diag_gaussian_log_density(
                    [v].into_iter(),
                    [0.0].into_iter(),
                    [1.0].into_iter(),
                )
            })
            .sum();
        assert!((got - expected).abs() < 1e-12);
    }

    #[test]
    fn score_sums_over_sequences() {
        let model = single_state_model(0.5, 2.0);
        let x = DMatrix::from_row_slice(4, 1, &[0.1, 0.2, 0.3, 0.4]);

        let whole = model.score(&x, &[4]).unwrap();
        let split = model.score(&x, &[2, 2]).unwrap();
        assert!((whole - split).abs() < 1e-12);
    }

    #[test]
    fn score_rejects_bad_lengths() {
        let model = single_state_model(0.0, 1.0);
        let x = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 2.0]);
        assert!(model.score(&x, &[2]).is_err());
        assert!(model.score(&x, &[3, 0]).is_err());
    }

    #[test]
    fn two_state_model_prefers_matching_data() {
        // States centered at -5 and +5 with a sticky transition matrix.
        let model = GaussianHmm {
            startprob: DVector::from_row_slice(&[0.5, 0.5]),
            transmat: DMatrix::from_row_slice(2, 2, &[0.9, 0.1, 0.1, 0.9]),
            means: DMatrix::from_row_slice(2, 1, &[-5.0, 5.0]),
            covars: DMatrix::from_row_slice(2, 1, &[1.0, 1.0]),
        };

        let near = DMatrix::from_row_slice(4, 1, &[-5.1, -4.9, 5.0, 5.2]);
        let far = DMatrix::from_row_slice(4, 1, &[0.0, 0.1, -0.2, 0.3]);

        let ll_near = model.score(&near, &[4]).unwrap();
        let ll_far = model.score(&far, &[4]).unwrap();
        assert!(ll_near > ll_far);
    }
}
