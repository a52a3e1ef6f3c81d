//! Training-data handling: word corpora, fold splitting, synthetic samples.

pub mod corpus;
pub mod folds;
pub mod sample;

pub use corpus::{combine_sequences, WordCorpus, WordData};
pub use folds::kfold;
pub use sample::{generate_sample, SampleCorpus};
