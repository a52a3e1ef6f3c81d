//! CSV corpus ingest and normalization.
//!
//! The expected schema is one frame per row:
//!
//! ```text
//! word,seq,f0,f1,...
//! FISH,0,1.25,-0.5,...
//! ```
//!
//! `seq` numbers the training sequences within a word; frames of a sequence
//! appear in file order. Design goals, in order:
//!
//! - **Strict schema** for the two key columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (no hidden randomness)
//! - **Separation of concerns**: no fitting logic here

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use nalgebra::DMatrix;

use crate::data::WordCorpus;
use crate::domain::CorpusStats;
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub word: Option<String>,
    pub message: String,
}

/// Ingest output: the corpus + stats + row errors.
#[derive(Debug, Clone)]
pub struct IngestedCorpus {
    pub corpus: WordCorpus,
    pub stats: CorpusStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load and normalize a corpus CSV.
pub fn load_corpus_csv(path: &Path) -> Result<IngestedCorpus, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::config(format!("Failed to open CSV '{}': {e}", path.display()))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::config(format!("Failed to read CSV headers: {e}")))?
        .clone();

    if headers.len() < 3 {
        return Err(AppError::config(
            "CSV needs at least 'word', 'seq' and one feature column.",
        ));
    }
    let word_ok = headers.get(0).is_some_and(|h| h.eq_ignore_ascii_case("word"));
    let seq_ok = headers.get(1).is_some_and(|h| h.eq_ignore_ascii_case("seq"));
    if !word_ok || !seq_ok {
        return Err(AppError::config(
            "CSV must start with 'word' and 'seq' columns.",
        ));
    }
    let n_features = headers.len() - 2;

    let mut rows_read = 0;
    let mut rows_used = 0;
    let mut row_errors = Vec::new();
    // (word, seq id) -> frames in file order. BTreeMap keeps sequence
    // numbering deterministic per word.
    let mut frames: BTreeMap<(String, u64), Vec<f64>> = BTreeMap::new();

    for (idx, record) in reader.records().enumerate() {
        // +2: one for the header row, one for 1-based line numbers.
        let line = idx + 2;
        rows_read += 1;

        let record = match record {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    word: None,
                    message: format!("Unreadable row: {e}"),
                });
                continue;
            }
        };

        if record.len() != headers.len() {
            row_errors.push(RowError {
                line,
                word: record.get(0).map(str::to_string),
                message: format!("Expected {} fields, got {}.", headers.len(), record.len()),
            });
            continue;
        }

        let word = match record.get(0) {
            Some(w) if !w.is_empty() => w.to_string(),
            _ => {
                row_errors.push(RowError {
                    line,
                    word: None,
                    message: "Missing word.".to_string(),
                });
                continue;
            }
        };

        let seq: u64 = match record.get(1).and_then(|s| s.parse().ok()) {
            Some(v) => v,
            None => {
                row_errors.push(RowError {
                    line,
                    word: Some(word),
                    message: "Invalid sequence id.".to_string(),
                });
                continue;
            }
        };

        let mut values = Vec::with_capacity(n_features);
        let mut bad_value = None;
        for j in 0..n_features {
            match record.get(j + 2).and_then(|s| s.parse::<f64>().ok()) {
                Some(v) if v.is_finite() => values.push(v),
                _ => {
                    bad_value = Some(j);
                    break;
                }
            }
        }
        if let Some(j) = bad_value {
            row_errors.push(RowError {
                line,
                word: Some(word),
                message: format!("Invalid value in feature column {}.", headers.get(j + 2).unwrap_or("?")),
            });
            continue;
        }

        frames.entry((word, seq)).or_default().extend(values);
        rows_used += 1;
    }

    let mut corpus = WordCorpus::new();
    for ((word, _seq), flat) in frames {
        let nrows = flat.len() / n_features;
        corpus.insert_sequence(&word, DMatrix::from_row_slice(nrows, n_features, &flat));
    }

    if corpus.is_empty() {
        return Err(AppError::data(format!(
            "No usable rows in '{}' ({} row error(s)).",
            path.display(),
            row_errors.len()
        )));
    }

    let stats = corpus.stats()?;
    Ok(IngestedCorpus {
        corpus,
        stats,
        row_errors,
        rows_read,
        rows_used,
    })
}
