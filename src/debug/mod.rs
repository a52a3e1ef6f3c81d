//! Debug bundle writer for inspecting selection runs.
//!
//! The bundle is a timestamped markdown file with the full candidate score
//! tables, which the terminal summary truncates. Useful when a criterion
//! picks a surprising state count and you want the whole sweep on record.

use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;

use crate::domain::{CandidateOutcome, CorpusStats, SelectConfig};
use crate::error::AppError;
use crate::fit::selection::StateSelection;

pub fn write_debug_bundle(
    config: &SelectConfig,
    stats: &CorpusStats,
    selections: &[StateSelection],
) -> Result<PathBuf, AppError> {
    let dir = PathBuf::from("debug");
    create_dir_all(&dir)
        .map_err(|e| AppError::numeric(format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!(
        "hmmsel_debug_{}_seed{}_{ts}.md",
        config.selector.display_name(),
        config.random_state
    ));

    let mut out = String::new();
    out.push_str("# hmmsel debug bundle\n");
    out.push_str(&format!("- generated: {}\n", Local::now().to_rfc3339()));
    out.push_str(&format!(
        "- selector: {}\n",
        config.selector.display_name()
    ));
    out.push_str(&format!(
        "- states: [{}, {}], constant fallback: {}\n",
        config.min_n_components, config.max_n_components, config.n_constant
    ));
    out.push_str(&format!(
        "- em: iters<={}, tol={}, min_covar={}, seed={}\n",
        config.n_iter, config.tol, config.min_covar, config.random_state
    ));
    out.push_str(&format!("- cv folds: {}\n", config.n_folds));
    out.push_str(&format!(
        "- corpus: {} word(s), {} sequence(s), {} frame(s), {} feature(s)\n",
        stats.n_words, stats.n_sequences, stats.n_frames, stats.n_features
    ));

    for s in selections {
        out.push_str(&format!("\n## Word: {}\n", s.word));
        out.push_str(&format!("- chosen_states: {}\n", s.chosen_states));
        match &s.model {
            Some(fit) => out.push_str(&format!(
                "- model: logL={:.6}, iterations={}, converged={}\n",
                fit.log_likelihood, fit.iterations, fit.converged
            )),
            None => out.push_str("- model: none\n"),
        }
        if let Some(reason) = &s.fallback {
            out.push_str(&format!("- fallback: {reason}\n"));
        }

        if !s.candidates.is_empty() {
            out.push_str("\n| n_states | score | note |\n");
            out.push_str("| - | - | - |\n");
            for c in &s.candidates {
                match &c.outcome {
                    CandidateOutcome::Scored(score) => {
                        let note = if c.n_states == s.chosen_states && s.fallback.is_none() {
                            "chosen"
                        } else {
                            ""
                        };
                        out.push_str(&format!("| {} | {score:.6} | {note} |\n", c.n_states));
                    }
                    CandidateOutcome::Failed(reason) => {
                        out.push_str(&format!("| {} | - | {reason} |\n", c.n_states));
                    }
                }
            }
        }
    }

    let mut file = File::create(&path)
        .map_err(|e| AppError::numeric(format!("Failed to create debug file: {e}")))?;
    file.write_all(out.as_bytes())
        .map_err(|e| AppError::numeric(format!("Failed to write debug bundle: {e}")))?;

    Ok(path)
}
