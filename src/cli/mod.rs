//! Command-line parsing for the state-count selection tool.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::SelectorKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "hmmsel",
    version,
    about = "Per-word Gaussian-HMM state-count selection (constant/BIC/DIC/CV)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run selection over every word in the corpus and print a summary.
    Select(SelectArgs),
    /// Print the full candidate score table for a single word.
    Sweep(SweepArgs),
}

/// Common options for selection runs.
#[derive(Debug, Parser, Clone)]
pub struct SelectArgs {
    /// Selection strategy.
    #[arg(short = 's', long, value_enum, default_value_t = SelectorKind::Bic)]
    pub selector: SelectorKind,

    /// Fixed state count for the constant strategy and the fallback.
    #[arg(long, default_value_t = 3)]
    pub n_constant: usize,

    /// Smallest candidate state count.
    #[arg(long, default_value_t = 2)]
    pub min_states: usize,

    /// Largest candidate state count.
    #[arg(long, default_value_t = 10)]
    pub max_states: usize,

    /// EM iteration cap per fit.
    #[arg(long, default_value_t = 1000)]
    pub em_iters: usize,

    /// EM convergence tolerance on the log-likelihood delta.
    #[arg(long, default_value_t = 1e-2)]
    pub em_tol: f64,

    /// Cross-validation fold count.
    #[arg(long, default_value_t = 3)]
    pub folds: usize,

    /// Seed for model initialization.
    #[arg(long, default_value_t = 14)]
    pub seed: u64,

    /// Load the corpus from a `word,seq,f0..` CSV instead of generating one.
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,

    /// Synthetic corpus: number of words.
    #[arg(long, default_value_t = 5)]
    pub words: usize,

    /// Synthetic corpus: sequences per word.
    #[arg(long, default_value_t = 6)]
    pub sequences: usize,

    /// Synthetic corpus: feature dimensionality.
    #[arg(long, default_value_t = 4)]
    pub features: usize,

    /// Synthetic corpus: generation seed.
    #[arg(long, default_value_t = 42)]
    pub sample_seed: u64,

    /// Write per-word results to this CSV file.
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// Write the full selection report to this JSON file.
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Write a markdown debug bundle with full candidate tables.
    #[arg(long, default_value_t = false)]
    pub debug_bundle: bool,

    /// Print per-fit diagnostics to stderr.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Options for sweeping a single word.
#[derive(Debug, Parser, Clone)]
pub struct SweepArgs {
    /// Word whose candidate table to print.
    #[arg(short, long)]
    pub word: String,

    #[command(flatten)]
    pub select: SelectArgs,
}
