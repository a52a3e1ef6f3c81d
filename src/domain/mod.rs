//! Shared domain types for state-count selection.

pub mod types;

pub use types::{
    CandidateOutcome, CandidateScore, CorpusSource, CorpusStats, RunConfig, SampleConfig,
    SelectConfig, SelectorKind,
};
