//! Write the full selection report as JSON.
//!
//! The JSON report is the "portable" representation of a run:
//! - the selection config actually used
//! - corpus stats
//! - per-word chosen state counts with every candidate's score or failure
//!
//! Unlike the CSV export it keeps the whole candidate table, so runs can be
//! diffed or re-analyzed later.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::{CandidateScore, CorpusStats, SelectConfig};
use crate::error::AppError;
use crate::fit::selection::StateSelection;

/// Top-level JSON schema.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionFile {
    pub tool: String,
    pub config: SelectConfig,
    pub stats: CorpusStats,
    pub words: Vec<WordReport>,
}

/// Per-word entry of the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct WordReport {
    pub word: String,
    pub chosen_states: usize,
    pub score: Option<f64>,
    pub log_likelihood: Option<f64>,
    pub em_iterations: Option<usize>,
    pub converged: Option<bool>,
    pub candidates: Vec<CandidateScore>,
    pub fallback: Option<String>,
}

impl WordReport {
    fn from_selection(s: &StateSelection) -> Self {
        Self {
            word: s.word.clone(),
            chosen_states: s.chosen_states,
            score: s.chosen_score(),
            log_likelihood: s.model.as_ref().map(|m| m.log_likelihood),
            em_iterations: s.model.as_ref().map(|m| m.iterations),
            converged: s.model.as_ref().map(|m| m.converged),
            candidates: s.candidates.clone(),
            fallback: s.fallback.clone(),
        }
    }
}

/// Write a selection report JSON file.
pub fn write_selection_json(
    path: &Path,
    config: &SelectConfig,
    stats: &CorpusStats,
    selections: &[StateSelection],
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::config(format!(
            "Failed to create report JSON '{}': {e}",
            path.display()
        ))
    })?;

    let report = SelectionFile {
        tool: "hmmsel".to_string(),
        config: config.clone(),
        stats: stats.clone(),
        words: selections.iter().map(WordReport::from_selection).collect(),
    };

    serde_json::to_writer_pretty(file, &report)
        .map_err(|e| AppError::config(format!("Failed to write report JSON: {e}")))?;

    Ok(())
}
