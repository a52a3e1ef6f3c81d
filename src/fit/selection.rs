//! State-count selection strategies (constant / BIC / DIC / CV).
//!
//! Every strategy sweeps candidate state counts over the configured range,
//! scores each candidate by its criterion, and picks the candidate with the
//! **minimum** score. Selection rules:
//!
//! 1. A candidate whose fit or scoring fails is recorded as `Failed` and
//!    skipped (it never wins the sweep).
//! 2. Ties resolve to the smallest state count (ascending sweep, strict `<`).
//! 3. A sweep with zero scored candidates falls back to the constant state
//!    count, with the reason recorded on the result.
//!
//! Note on direction: BIC is a cost (smaller is better), while DIC and
//! cross-validated log-likelihood are conventionally maximized. This
//! implementation deliberately keeps argmin for all three; tests pin that
//! direction so any future flip is an explicit decision.

use crate::data::{combine_sequences, kfold, WordData};
use crate::domain::{CandidateScore, SelectConfig, SelectorKind};
use crate::fit::fitter::{fit_gaussian_hmm, FitOptions, FittedModel};

/// Output of one `select()` call for one word.
#[derive(Debug, Clone)]
pub struct StateSelection {
    pub word: String,
    /// Strategy that produced this result.
    pub selector: SelectorKind,
    /// Chosen state count; always within the configured range or equal to
    /// the constant fallback.
    pub chosen_states: usize,
    /// Model refit at `chosen_states`; `None` only when even the fallback
    /// fit failed.
    pub model: Option<FittedModel>,
    /// Criterion score (or failure reason) per candidate, in sweep order.
    /// Empty for the constant strategy.
    pub candidates: Vec<CandidateScore>,
    /// Why the sweep fell back to the constant state count, if it did.
    pub fallback: Option<String>,
}

impl StateSelection {
    /// Score of the chosen candidate, when the sweep produced one.
    pub fn chosen_score(&self) -> Option<f64> {
        self.candidates
            .iter()
            .find(|c| c.n_states == self.chosen_states)
            .and_then(|c| c.score())
    }
}

/// Per-word selection context: training data plus the run configuration.
pub struct Selector<'a> {
    data: &'a WordData,
    config: &'a SelectConfig,
}

impl<'a> Selector<'a> {
    pub fn new(data: &'a WordData, config: &'a SelectConfig) -> Self {
        Self { data, config }
    }

    /// Run the configured strategy.
    pub fn select(&self) -> StateSelection {
        match self.config.selector {
            SelectorKind::Constant => self.select_constant(),
            SelectorKind::Bic => self.select_bic(),
            SelectorKind::Dic => self.select_dic(),
            SelectorKind::CrossVal => self.select_cv(),
        }
    }

    /// Attempt to fit a candidate model; failures yield `None` instead of
    /// propagating (a failed candidate must not abort the sweep).
    pub fn base_model(&self, n_states: usize) -> Option<FittedModel> {
        let opts = FitOptions::from_config(self.config);
        match fit_gaussian_hmm(&self.data.x, &self.data.lengths, n_states, &opts) {
            Ok(fit) => {
                if self.config.verbose {
                    eprintln!(
                        "model created for {} with {} states (logL={:.3})",
                        self.data.word, n_states, fit.log_likelihood
                    );
                }
                Some(fit)
            }
            Err(err) => {
                if self.config.verbose {
                    eprintln!(
                        "failure on {} with {} states: {err}",
                        self.data.word, n_states
                    );
                }
                None
            }
        }
    }

    fn select_constant(&self) -> StateSelection {
        let n = self.config.n_constant;
        StateSelection {
            word: self.data.word.clone(),
            selector: SelectorKind::Constant,
            chosen_states: n,
            model: self.base_model(n),
            candidates: Vec::new(),
            fallback: None,
        }
    }

    fn select_bic(&self) -> StateSelection {
        let d = self.data.n_features();
        let mut candidates = Vec::new();

        for n in self.config.state_range() {
            match self.base_model(n) {
                Some(fit) => {
                    // Free parameters: transition probabilities plus
                    // per-state means and variances.
                    let p = n * (n - 1) + 2 * n * d;
                    // BIC = -2 logL + p ln(n); the penalty scales with the
                    // candidate state count.
                    let score =
                        -2.0 * fit.log_likelihood + p as f64 * (n as f64).ln();
                    candidates.push(CandidateScore::scored(n, score));
                }
                None => candidates.push(CandidateScore::failed(n, "model fit failed")),
            }
        }

        self.finish_sweep(SelectorKind::Bic, candidates)
    }

    fn select_dic(&self) -> StateSelection {
        // First pass: own-data log-likelihood per candidate.
        let mut fits: Vec<(usize, Option<f64>)> = Vec::new();
        for n in self.config.state_range() {
            let ll = self.base_model(n).map(|fit| fit.log_likelihood);
            fits.push((n, ll));
        }

        let scored: Vec<f64> = fits.iter().filter_map(|(_, ll)| *ll).collect();
        let m = scored.len();
        let sum: f64 = scored.iter().sum();

        // DIC = logL(n) - avg over the *other* candidates' log-likelihoods,
        // used here as a proxy for the anti-likelihood term. With a single
        // scored candidate the average is undefined, so its own logL stands.
        let candidates: Vec<CandidateScore> = fits
            .into_iter()
            .map(|(n, ll)| match ll {
                Some(ll) if m > 1 => {
                    let anti = -(sum - ll) / (m as f64 - 1.0);
                    CandidateScore::scored(n, ll + anti)
                }
                Some(ll) => CandidateScore::scored(n, ll),
                None => CandidateScore::failed(n, "model fit failed"),
            })
            .collect();

        self.finish_sweep(SelectorKind::Dic, candidates)
    }

    fn select_cv(&self) -> StateSelection {
        let sequences = &self.data.sequences;
        let folds = match kfold(sequences.len(), self.config.n_folds) {
            Ok(folds) => folds,
            Err(err) => {
                return self.fallback(
                    SelectorKind::CrossVal,
                    Vec::new(),
                    format!("cross-validation split failed: {err}"),
                );
            }
        };

        let mut candidates = Vec::new();
        for n in self.config.state_range() {
            let Some(fit) = self.base_model(n) else {
                candidates.push(CandidateScore::failed(n, "model fit failed"));
                continue;
            };

            // The model is fit once on the full training set; folds only
            // control which sequences we *score* it on.
            let mut fold_scores = Vec::with_capacity(folds.len());
            let mut failure = None;
            for (_, test_idx) in &folds {
                let scored = combine_sequences(test_idx, sequences)
                    .and_then(|(x, lengths)| fit.hmm.score(&x, &lengths));
                match scored {
                    Ok(ll) => fold_scores.push(ll),
                    Err(err) => {
                        failure = Some(format!("fold scoring failed: {err}"));
                        break;
                    }
                }
            }

            match failure {
                Some(reason) => candidates.push(CandidateScore::failed(n, reason)),
                None => {
                    let mean = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
                    candidates.push(CandidateScore::scored(n, mean));
                }
            }
        }

        self.finish_sweep(SelectorKind::CrossVal, candidates)
    }

    /// Pick the minimum-score candidate, or fall back to the constant.
    fn finish_sweep(
        &self,
        selector: SelectorKind,
        candidates: Vec<CandidateScore>,
    ) -> StateSelection {
        let mut best: Option<(usize, f64)> = None;
        for c in &candidates {
            if let Some(score) = c.score() {
                match best {
                    Some((_, best_score)) if score >= best_score => {}
                    _ => best = Some((c.n_states, score)),
                }
            }
        }

        match best {
            Some((n, _)) => StateSelection {
                word: self.data.word.clone(),
                selector,
                chosen_states: n,
                model: self.base_model(n),
                candidates,
                fallback: None,
            },
            None => self.fallback(
                selector,
                candidates,
                format!("no scored {} candidates", selector.display_name()),
            ),
        }
    }

    /// Explicit degradation to the constant state count.
    fn fallback(
        &self,
        selector: SelectorKind,
        candidates: Vec<CandidateScore>,
        reason: String,
    ) -> StateSelection {
        if self.config.verbose {
            eprintln!(
                "falling back to n={} for {}: {reason}",
                self.config.n_constant, self.data.word
            );
        }
        StateSelection {
            word: self.data.word.clone(),
            selector,
            chosen_states: self.config.n_constant,
            model: self.base_model(self.config.n_constant),
            candidates,
            fallback: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::WordCorpus;
    use nalgebra::DMatrix;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::{Distribution, Normal};

    /// Build a word with `n_seqs` sequences emitted from a 3-regime process.
    fn word_data(word: &str, n_seqs: usize, seed: u64) -> WordData {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 0.6).unwrap();
        let mut corpus = WordCorpus::new();

        for _ in 0..n_seqs {
            let len = rng.gen_range(18..=24);
            let mut values = Vec::with_capacity(len * 2);
            for t in 0..len {
                let regime = (3 * t / len) as f64;
                values.push(regime * 4.0 + normal.sample(&mut rng));
                values.push(-regime * 3.0 + normal.sample(&mut rng));
            }
            corpus.insert_sequence(word, DMatrix::from_row_slice(len, 2, &values));
        }
        corpus.word_data(word).unwrap()
    }

    fn config(selector: SelectorKind) -> SelectConfig {
        SelectConfig {
            selector,
            min_n_components: 2,
            max_n_components: 4,
            n_iter: 50,
            ..SelectConfig::default()
        }
    }

    #[test]
    fn constant_selector_ignores_the_data() {
        for seed in [1, 2, 3] {
            let data = word_data("FISH", 3, seed);
            let config = config(SelectorKind::Constant);
            let selection = Selector::new(&data, &config).select();
            assert_eq!(selection.chosen_states, config.n_constant);
            assert!(selection.candidates.is_empty());
            assert!(selection.fallback.is_none());
            assert!(selection.model.is_some());
        }
    }

    #[test]
    fn bic_sweep_evaluates_every_candidate_in_range() {
        // min=2, max=4 -> exactly 3 candidates, chosen n within the range.
        let data = word_data("FISH", 3, 14);
        let config = config(SelectorKind::Bic);
        let selection = Selector::new(&data, &config).select();

        assert_eq!(selection.candidates.len(), 3);
        let swept: Vec<usize> = selection.candidates.iter().map(|c| c.n_states).collect();
        assert_eq!(swept, vec![2, 3, 4]);
        assert!((2..=4).contains(&selection.chosen_states));
        assert!(selection.model.is_some());
    }

    #[test]
    fn bic_picks_the_minimum_score() {
        let data = word_data("FISH", 4, 14);
        let config = config(SelectorKind::Bic);
        let selection = Selector::new(&data, &config).select();

        let chosen = selection.chosen_score().unwrap();
        for c in &selection.candidates {
            if let Some(score) = c.score() {
                assert!(chosen <= score, "candidate n={} beat the chosen score", c.n_states);
            }
        }
    }

    #[test]
    fn bic_score_matches_formula() {
        let data = word_data("FISH", 3, 14);
        let config = config(SelectorKind::Bic);
        let selector = Selector::new(&data, &config);
        let selection = selector.select();

        let d = data.n_features();
        for c in &selection.candidates {
            let Some(score) = c.score() else { continue };
            let fit = selector.base_model(c.n_states).unwrap();
            let n = c.n_states;
            let p = n * (n - 1) + 2 * n * d;
            let expected = -2.0 * fit.log_likelihood + p as f64 * (n as f64).ln();
            assert!((score - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn dic_select_takes_argmin_over_scores() {
        let data = word_data("CHOCOLATE", 3, 9);
        let config = config(SelectorKind::Dic);
        let selection = Selector::new(&data, &config).select();

        let chosen = selection.chosen_score().unwrap();
        for c in &selection.candidates {
            if let Some(score) = c.score() {
                assert!(chosen <= score);
            }
        }
        assert!(selection.fallback.is_none());
    }

    #[test]
    fn dic_scores_follow_the_anti_likelihood_formula() {
        let data = word_data("CHOCOLATE", 3, 9);
        let config = config(SelectorKind::Dic);
        let selector = Selector::new(&data, &config);
        let selection = selector.select();

        let lls: Vec<(usize, f64)> = selection
            .candidates
            .iter()
            .filter(|c| c.score().is_some())
            .map(|c| {
                let fit = selector.base_model(c.n_states).unwrap();
                (c.n_states, fit.log_likelihood)
            })
            .collect();
        let m = lls.len() as f64;
        let sum: f64 = lls.iter().map(|(_, ll)| ll).sum();

        for c in &selection.candidates {
            let Some(score) = c.score() else { continue };
            let (_, ll) = lls.iter().find(|(n, _)| *n == c.n_states).unwrap();
            let expected = ll - (sum - ll) / (m - 1.0);
            assert!((score - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn cv_select_takes_argmin_over_scores() {
        let data = word_data("VEGETABLE", 6, 5);
        let config = config(SelectorKind::CrossVal);
        let selection = Selector::new(&data, &config).select();

        assert!(selection.fallback.is_none());
        let chosen = selection.chosen_score().unwrap();
        for c in &selection.candidates {
            if let Some(score) = c.score() {
                assert!(chosen <= score);
            }
        }
    }

    #[test]
    fn cv_with_single_sequence_falls_back_to_constant() {
        let data = word_data("BOOK", 1, 3);
        let config = config(SelectorKind::CrossVal);
        let selection = Selector::new(&data, &config).select();

        assert_eq!(selection.chosen_states, config.n_constant);
        assert!(selection.fallback.is_some());
        assert!(selection.candidates.is_empty());

        // The fallback result equals what the constant strategy returns.
        let constant_config = SelectConfig {
            selector: SelectorKind::Constant,
            ..config
        };
        let constant = Selector::new(&data, &constant_config).select();
        assert_eq!(selection.chosen_states, constant.chosen_states);
        let (a, b) = (selection.model.unwrap(), constant.model.unwrap());
        assert_eq!(a.log_likelihood, b.log_likelihood);
    }

    #[test]
    fn all_failed_candidates_degrade_to_the_constant() {
        // A range whose every candidate needs more frames than the word has
        // makes every fit fail, leaving the constant fallback.
        let mut corpus = WordCorpus::new();
        corpus.insert_sequence("GO", DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 2.0]));
        corpus.insert_sequence("GO", DMatrix::from_row_slice(2, 1, &[0.5, 1.5]));
        let data = corpus.word_data("GO").unwrap();

        let config = SelectConfig {
            selector: SelectorKind::Bic,
            n_constant: 2,
            min_n_components: 6,
            max_n_components: 8,
            ..SelectConfig::default()
        };
        let selection = Selector::new(&data, &config).select();

        assert_eq!(selection.candidates.len(), 3);
        assert!(selection.candidates.iter().all(|c| c.score().is_none()));
        assert_eq!(selection.chosen_states, 2);
        assert!(selection.fallback.is_some());
        assert!(selection.model.is_some());
    }

    #[test]
    fn dic_with_one_scored_candidate_chooses_it() {
        // Two frames fit n=2 but not n=3 or n=4, so exactly one candidate
        // scores. The anti-likelihood average is undefined with a single
        // score; the candidate's own log-likelihood stands and it wins.
        let mut corpus = WordCorpus::new();
        corpus.insert_sequence("SAY", DMatrix::from_row_slice(2, 1, &[0.0, 4.0]));
        let data = corpus.word_data("SAY").unwrap();

        let config = SelectConfig {
            selector: SelectorKind::Dic,
            min_n_components: 2,
            max_n_components: 4,
            ..SelectConfig::default()
        };
        let selection = Selector::new(&data, &config).select();

        assert_eq!(selection.chosen_states, 2);
        assert!(selection.fallback.is_none());
        let scored = selection
            .candidates
            .iter()
            .filter(|c| c.score().is_some())
            .count();
        assert_eq!(scored, 1);

        // With one score the DIC value is the fit's own log-likelihood.
        let chosen_score = selection.chosen_score().unwrap();
        let fit = selection.model.unwrap();
        assert_eq!(chosen_score, fit.log_likelihood);
    }

    #[test]
    fn refit_is_deterministic_for_a_fixed_seed() {
        let data = word_data("MARY", 3, 21);
        let config = config(SelectorKind::Bic);
        let selector = Selector::new(&data, &config);

        let a = selector.base_model(3).unwrap();
        let b = selector.base_model(3).unwrap();
        assert_eq!(a.log_likelihood, b.log_likelihood);
    }

    #[test]
    fn selection_never_leaves_the_candidate_range_or_fallback() {
        let data = word_data("HOUSE", 5, 11);
        for kind in SelectorKind::ALL {
            let config = config(kind);
            let selection = Selector::new(&data, &config).select();
            let in_range = config.state_range().contains(&selection.chosen_states);
            let is_fallback = selection.chosen_states == config.n_constant;
            assert!(
                in_range || is_fallback,
                "{}: chose {}",
                kind.display_name(),
                selection.chosen_states
            );
        }
    }
}
