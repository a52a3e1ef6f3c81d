//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and selection
//! - exported to JSON/CSV
//! - reloaded later for comparisons across runs

use std::ops::RangeInclusive;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Which state-count selection strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    /// Always use the configured constant state count (no search).
    Constant,
    /// Bayesian Information Criterion sweep (argmin).
    Bic,
    /// Discriminative Information Criterion sweep (argmin).
    Dic,
    /// K-fold cross-validated average log-likelihood sweep (argmin).
    #[value(name = "cv")]
    CrossVal,
}

impl SelectorKind {
    pub const ALL: [SelectorKind; 4] = [
        SelectorKind::Constant,
        SelectorKind::Bic,
        SelectorKind::Dic,
        SelectorKind::CrossVal,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            SelectorKind::Constant => "constant",
            SelectorKind::Bic => "BIC",
            SelectorKind::Dic => "DIC",
            SelectorKind::CrossVal => "CV",
        }
    }
}

/// Configuration for a state-count selection run.
///
/// One `SelectConfig` is shared by every per-word selector in a run; the
/// per-word training data lives in `data::WordData`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectConfig {
    /// Selection strategy.
    pub selector: SelectorKind,
    /// Fixed state count used by the constant selector and as the fallback
    /// when a criterion sweep produces no usable score.
    pub n_constant: usize,
    /// Smallest candidate state count (inclusive).
    pub min_n_components: usize,
    /// Largest candidate state count (inclusive).
    pub max_n_components: usize,
    /// EM iteration cap per fit.
    pub n_iter: usize,
    /// EM convergence tolerance on the log-likelihood delta.
    pub tol: f64,
    /// Floor applied to per-dimension variances during EM.
    pub min_covar: f64,
    /// Number of cross-validation folds.
    pub n_folds: usize,
    /// Seed for model initialization (reproducibility).
    pub random_state: u64,
    /// Print per-fit diagnostics to stderr.
    pub verbose: bool,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            selector: SelectorKind::Bic,
            n_constant: 3,
            min_n_components: 2,
            max_n_components: 10,
            n_iter: 1000,
            tol: 1e-2,
            min_covar: 1e-3,
            n_folds: 3,
            random_state: 14,
            verbose: false,
        }
    }
}

impl SelectConfig {
    /// Candidate state counts swept by the criterion selectors.
    pub fn state_range(&self) -> RangeInclusive<usize> {
        self.min_n_components..=self.max_n_components
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.min_n_components < 1 {
            return Err(AppError::config("min-states must be >= 1."));
        }
        if self.max_n_components < self.min_n_components {
            return Err(AppError::config(format!(
                "Invalid state range: min={} > max={}.",
                self.min_n_components, self.max_n_components
            )));
        }
        if self.n_constant < 1 {
            return Err(AppError::config("n-constant must be >= 1."));
        }
        if self.n_iter == 0 {
            return Err(AppError::config("EM iteration cap must be > 0."));
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(AppError::config("EM tolerance must be finite and > 0."));
        }
        if !(self.min_covar.is_finite() && self.min_covar > 0.0) {
            return Err(AppError::config("Variance floor must be finite and > 0."));
        }
        if self.n_folds < 2 {
            return Err(AppError::config("CV fold count must be >= 2."));
        }
        Ok(())
    }
}

/// Outcome of scoring a single candidate state count.
///
/// Keeping failures alongside scores (instead of discarding them) makes the
/// fallback decision auditable in reports and debug bundles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum CandidateOutcome {
    /// The candidate fit succeeded and produced a criterion score.
    Scored(f64),
    /// The candidate was skipped, with the reason.
    Failed(String),
}

/// Criterion score (or failure) for one candidate state count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub n_states: usize,
    pub outcome: CandidateOutcome,
}

impl CandidateScore {
    pub fn scored(n_states: usize, score: f64) -> Self {
        Self {
            n_states,
            outcome: CandidateOutcome::Scored(score),
        }
    }

    pub fn failed(n_states: usize, reason: impl Into<String>) -> Self {
        Self {
            n_states,
            outcome: CandidateOutcome::Failed(reason.into()),
        }
    }

    pub fn score(&self) -> Option<f64> {
        match &self.outcome {
            CandidateOutcome::Scored(s) => Some(*s),
            CandidateOutcome::Failed(_) => None,
        }
    }
}

/// Summary stats about the corpus actually used for selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusStats {
    pub n_words: usize,
    pub n_sequences: usize,
    pub n_frames: usize,
    pub n_features: usize,
}

/// Configuration for synthetic corpus generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleConfig {
    /// Number of vocabulary words to generate.
    pub n_words: usize,
    /// Training sequences per word.
    pub sequences_per_word: usize,
    /// Feature dimensionality of each frame.
    pub n_features: usize,
    /// Minimum frames per sequence.
    pub frames_min: usize,
    /// Maximum frames per sequence.
    pub frames_max: usize,
    /// Seed for sequence generation (combined with the other knobs).
    pub sample_seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            n_words: 5,
            sequences_per_word: 6,
            n_features: 4,
            frames_min: 20,
            frames_max: 40,
            sample_seed: 42,
        }
    }
}

impl SampleConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.n_words == 0 {
            return Err(AppError::config("Word count must be > 0."));
        }
        if self.sequences_per_word == 0 {
            return Err(AppError::config("Sequences per word must be > 0."));
        }
        if self.n_features == 0 {
            return Err(AppError::config("Feature count must be > 0."));
        }
        if self.frames_min == 0 || self.frames_max < self.frames_min {
            return Err(AppError::config(format!(
                "Invalid frame range: min={} max={}.",
                self.frames_min, self.frames_max
            )));
        }
        Ok(())
    }
}

/// Where the training corpus comes from.
#[derive(Debug, Clone)]
pub enum CorpusSource {
    /// Generate a synthetic corpus from seeded ground-truth models.
    Synthetic(SampleConfig),
    /// Load a corpus from a `word,seq,f0..fk` CSV file.
    Csv(PathBuf),
}

/// Full configuration for one `hmmsel` run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub select: SelectConfig,
    pub corpus: CorpusSource,
    /// Optional per-word results CSV.
    pub export_csv: Option<PathBuf>,
    /// Optional JSON selection report.
    pub export_json: Option<PathBuf>,
    /// Write a markdown debug bundle with full candidate tables.
    pub debug_bundle: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        SelectConfig::default().validate().unwrap();
        SampleConfig::default().validate().unwrap();
    }

    #[test]
    fn inverted_state_range_is_rejected() {
        let config = SelectConfig {
            min_n_components: 5,
            max_n_components: 2,
            ..SelectConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn candidate_score_accessor() {
        assert_eq!(CandidateScore::scored(3, 1.5).score(), Some(1.5));
        assert_eq!(CandidateScore::failed(3, "no fit").score(), None);
    }
}
