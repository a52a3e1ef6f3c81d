//! Word corpus: per-word training sequences and their concatenated form.
//!
//! Each sequence is a `frames × features` matrix. Fitting wants all of a
//! word's frames concatenated row-wise with per-sequence lengths (so the
//! forward/backward recursions can restart at sequence boundaries), while
//! cross-validation wants the individual sequences back; `WordData` carries
//! both views.

use std::collections::BTreeMap;

use nalgebra::DMatrix;

use crate::domain::CorpusStats;
use crate::error::AppError;

/// All training sequences for a vocabulary, keyed by word.
///
/// A `BTreeMap` keeps word iteration order deterministic across runs.
#[derive(Debug, Clone, Default)]
pub struct WordCorpus {
    words: BTreeMap<String, Vec<DMatrix<f64>>>,
}

impl WordCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_sequence(&mut self, word: &str, sequence: DMatrix<f64>) {
        self.words.entry(word.to_string()).or_default().push(sequence);
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.keys().map(String::as_str)
    }

    pub fn n_words(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Build the fitting view of one word's training data.
    pub fn word_data(&self, word: &str) -> Result<WordData, AppError> {
        let sequences = self
            .words
            .get(word)
            .ok_or_else(|| AppError::data(format!("Unknown word '{word}'.")))?;
        if sequences.is_empty() {
            return Err(AppError::data(format!("Word '{word}' has no sequences.")));
        }

        let n_features = sequences[0].ncols();
        for (i, seq) in sequences.iter().enumerate() {
            if seq.nrows() == 0 {
                return Err(AppError::data(format!(
                    "Word '{word}' sequence {i} is empty."
                )));
            }
            if seq.ncols() != n_features {
                return Err(AppError::data(format!(
                    "Word '{word}' sequence {i} has {} features, expected {n_features}.",
                    seq.ncols()
                )));
            }
        }

        let indices: Vec<usize> = (0..sequences.len()).collect();
        let (x, lengths) = combine_sequences(&indices, sequences)?;
        Ok(WordData {
            word: word.to_string(),
            sequences: sequences.clone(),
            x,
            lengths,
        })
    }

    pub fn stats(&self) -> Result<CorpusStats, AppError> {
        let mut n_sequences = 0;
        let mut n_frames = 0;
        let mut n_features = None;

        for sequences in self.words.values() {
            for seq in sequences {
                n_sequences += 1;
                n_frames += seq.nrows();
                let d = seq.ncols();
                match n_features {
                    None => n_features = Some(d),
                    Some(expected) if expected != d => {
                        return Err(AppError::data(format!(
                            "Inconsistent feature dimensionality: {expected} vs {d}."
                        )));
                    }
                    Some(_) => {}
                }
            }
        }

        let n_features = n_features.ok_or_else(|| AppError::data("Corpus is empty."))?;
        Ok(CorpusStats {
            n_words: self.words.len(),
            n_sequences,
            n_frames,
            n_features,
        })
    }
}

/// One word's training data in both per-sequence and concatenated form.
#[derive(Debug, Clone)]
pub struct WordData {
    pub word: String,
    /// Individual sequences in corpus order.
    pub sequences: Vec<DMatrix<f64>>,
    /// Row-wise concatenation of `sequences`.
    pub x: DMatrix<f64>,
    /// Frame count of each sequence; sums to `x.nrows()`.
    pub lengths: Vec<usize>,
}

impl WordData {
    pub fn n_sequences(&self) -> usize {
        self.sequences.len()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

/// Rebuild a concatenated feature matrix + lengths from a subset of
/// sequence indices (used for scoring held-out cross-validation folds).
pub fn combine_sequences(
    indices: &[usize],
    sequences: &[DMatrix<f64>],
) -> Result<(DMatrix<f64>, Vec<usize>), AppError> {
    if indices.is_empty() {
        return Err(AppError::data("No sequence indices to combine."));
    }

    let mut lengths = Vec::with_capacity(indices.len());
    let mut total_rows = 0;
    let mut n_features = None;
    for &idx in indices {
        let seq = sequences
            .get(idx)
            .ok_or_else(|| AppError::data(format!("Sequence index {idx} out of range.")))?;
        match n_features {
            None => n_features = Some(seq.ncols()),
            Some(expected) if expected != seq.ncols() => {
                return Err(AppError::data(
                    "Inconsistent feature dimensionality across sequences.",
                ));
            }
            Some(_) => {}
        }
        lengths.push(seq.nrows());
        total_rows += seq.nrows();
    }

    let n_features = n_features.unwrap_or(0);
    let mut x = DMatrix::zeros(total_rows, n_features);
    let mut offset = 0;
    for &idx in indices {
        let seq = &sequences[idx];
        x.rows_mut(offset, seq.nrows()).copy_from(seq);
        offset += seq.nrows();
    }

    Ok((x, lengths))
}
