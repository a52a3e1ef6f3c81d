//! Deterministic K-fold index splitting.
//!
//! Folds are contiguous, unshuffled blocks with the conventional sizing:
//! the first `n % k` folds get `n / k + 1` samples, the rest get `n / k`.
//! Determinism matters here because fold assignment feeds the CV criterion
//! scores directly.

use crate::error::AppError;

/// Split `0..n_samples` into `n_splits` (train, test) index pairs.
pub fn kfold(n_samples: usize, n_splits: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>, AppError> {
    if n_splits < 2 {
        return Err(AppError::config(format!(
            "Fold count must be >= 2, got {n_splits}."
        )));
    }
    if n_samples < n_splits {
        return Err(AppError::data(format!(
            "Cannot split {n_samples} sequence(s) into {n_splits} folds."
        )));
    }

    let base = n_samples / n_splits;
    let extra = n_samples % n_splits;

    let mut folds = Vec::with_capacity(n_splits);
    let mut start = 0;
    for f in 0..n_splits {
        let size = base + usize::from(f < extra);
        let test: Vec<usize> = (start..start + size).collect();
        let train: Vec<usize> = (0..n_samples).filter(|i| !test.contains(i)).collect();
        folds.push((train, test));
        start += size;
    }
    Ok(folds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_sizes_follow_remainder_rule() {
        // n=7, k=3: test sizes 3, 2, 2.
        let folds = kfold(7, 3).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|(_, test)| test.len()).collect();
        assert_eq!(sizes, vec![3, 2, 2]);
    }

    #[test]
    fn test_folds_partition_the_samples() {
        let folds = kfold(10, 4).unwrap();
        let mut seen: Vec<usize> = folds.iter().flat_map(|(_, test)| test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());

        for (train, test) in &folds {
            assert_eq!(train.len() + test.len(), 10);
            assert!(train.iter().all(|i| !test.contains(i)));
        }
    }

    #[test]
    fn too_few_samples_is_a_data_error() {
        let err = kfold(1, 3).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        let err = kfold(2, 3).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn fewer_than_two_splits_is_a_config_error() {
        let err = kfold(5, 1).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
