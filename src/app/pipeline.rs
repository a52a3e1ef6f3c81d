//! Shared "selection pipeline" logic used by both subcommands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! corpus load/generate -> per-word selection -> reports/exports
//!
//! The subcommand handlers can then focus on presentation.

use crate::data::{generate_sample, WordCorpus};
use crate::domain::{CorpusSource, CorpusStats, RunConfig};
use crate::error::AppError;
use crate::fit::selection::{Selector, StateSelection};
use crate::io::load_corpus_csv;

/// All computed outputs of a single `hmmsel select` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub stats: CorpusStats,
    pub selections: Vec<StateSelection>,
}

/// Load or generate the training corpus.
pub fn load_corpus(config: &RunConfig) -> Result<(WordCorpus, CorpusStats), AppError> {
    match &config.corpus {
        CorpusSource::Synthetic(sample_config) => {
            let sample = generate_sample(sample_config)?;
            Ok((sample.corpus, sample.stats))
        }
        CorpusSource::Csv(path) => {
            let ingest = load_corpus_csv(path)?;
            if !ingest.row_errors.is_empty() {
                eprintln!(
                    "{} of {} rows skipped during ingest (first: line {}: {})",
                    ingest.row_errors.len(),
                    ingest.rows_read,
                    ingest.row_errors[0].line,
                    ingest.row_errors[0].message
                );
            }
            Ok((ingest.corpus, ingest.stats))
        }
    }
}

/// Execute the full selection pipeline over every word.
pub fn run_select(config: &RunConfig) -> Result<RunOutput, AppError> {
    config.select.validate()?;
    let (corpus, stats) = load_corpus(config)?;

    let mut selections = Vec::with_capacity(corpus.n_words());
    for word in corpus.words() {
        let data = corpus.word_data(word)?;
        let selector = Selector::new(&data, &config.select);
        selections.push(selector.select());
    }

    Ok(RunOutput { stats, selections })
}

/// Run selection for a single word (the `sweep` subcommand).
pub fn run_sweep(config: &RunConfig, word: &str) -> Result<StateSelection, AppError> {
    config.select.validate()?;
    let (corpus, _stats) = load_corpus(config)?;
    let data = corpus.word_data(word)?;
    Ok(Selector::new(&data, &config.select).select())
}
