//! Formatted terminal output for selection runs.

use crate::domain::{CandidateOutcome, CorpusStats, SelectConfig};
use crate::fit::selection::StateSelection;

/// Format the full run summary (corpus stats + per-word selections).
pub fn format_run_summary(
    stats: &CorpusStats,
    config: &SelectConfig,
    selections: &[StateSelection],
) -> String {
    let mut out = String::new();

    out.push_str("=== hmmsel - HMM state-count selection ===\n");
    out.push_str(&format!(
        "Selector: {} | states=[{}, {}] | constant={} | seed={}\n",
        config.selector.display_name(),
        config.min_n_components,
        config.max_n_components,
        config.n_constant,
        config.random_state,
    ));
    out.push_str(&format!(
        "Corpus: {} word(s) | {} sequence(s) | {} frame(s) | {} feature(s)\n",
        stats.n_words, stats.n_sequences, stats.n_frames, stats.n_features,
    ));

    out.push_str("\nPer-word selections:\n");
    for s in selections {
        let score = s
            .chosen_score()
            .map(|v| format!("score={v:.3}"))
            .unwrap_or_else(|| "score=-".to_string());
        let ll = s
            .model
            .as_ref()
            .map(|m| format!("logL={:.3}", m.log_likelihood))
            .unwrap_or_else(|| "no model".to_string());

        out.push_str(&format!(
            "  {:<12} -> {:>2} states | {} | {}",
            s.word, s.chosen_states, score, ll
        ));
        if let Some(reason) = &s.fallback {
            out.push_str(&format!(" | fallback: {reason}"));
        }
        out.push('\n');
    }

    let fallbacks = selections.iter().filter(|s| s.fallback.is_some()).count();
    let no_model = selections.iter().filter(|s| s.model.is_none()).count();
    out.push_str(&format!(
        "\n{} word(s), {} fallback(s), {} without a model\n",
        selections.len(),
        fallbacks,
        no_model
    ));

    out
}

/// Format the candidate score table of a single word's sweep.
pub fn format_sweep(selection: &StateSelection) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Word {} ({} sweep):\n",
        selection.word,
        selection.selector.display_name()
    ));
    if selection.candidates.is_empty() {
        out.push_str("  (no candidates swept)\n");
    }
    for c in &selection.candidates {
        let marker = if c.n_states == selection.chosen_states && selection.fallback.is_none() {
            " <- chosen"
        } else {
            ""
        };
        match &c.outcome {
            CandidateOutcome::Scored(score) => {
                out.push_str(&format!("  n={:>2}  score={score:.4}{marker}\n", c.n_states));
            }
            CandidateOutcome::Failed(reason) => {
                out.push_str(&format!("  n={:>2}  failed: {reason}\n", c.n_states));
            }
        }
    }
    if let Some(reason) = &selection.fallback {
        out.push_str(&format!(
            "  fallback -> n={} ({reason})\n",
            selection.chosen_states
        ));
    }

    out
}
