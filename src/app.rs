//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads or generates the training corpus
//! - runs per-word state-count selection
//! - prints reports
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, SelectArgs, SweepArgs};
use crate::domain::{CorpusSource, RunConfig, SampleConfig, SelectConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `hmmsel` binary.
pub fn run() -> Result<(), AppError> {
    // We want `hmmsel` and `hmmsel -s bic` to behave like `hmmsel select ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of
    // the argv list before parsing. This preserves a clean clap structure
    // while retaining the convenient default.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Select(args) => handle_select(args),
        Command::Sweep(args) => handle_sweep(args),
    }
}

fn handle_select(args: SelectArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let run = pipeline::run_select(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.stats, &config.select, &run.selections)
    );

    if let Some(path) = &config.export_csv {
        crate::io::write_results_csv(path, &run.selections)?;
        println!("Wrote results CSV: {}", path.display());
    }
    if let Some(path) = &config.export_json {
        crate::io::write_selection_json(path, &config.select, &run.stats, &run.selections)?;
        println!("Wrote report JSON: {}", path.display());
    }
    if config.debug_bundle {
        let path = crate::debug::write_debug_bundle(&config.select, &run.stats, &run.selections)?;
        println!("Wrote debug bundle: {}", path.display());
    }

    Ok(())
}

fn handle_sweep(args: SweepArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.select);
    let selection = pipeline::run_sweep(&config, &args.word)?;
    println!("{}", crate::report::format_sweep(&selection));
    Ok(())
}

fn run_config_from_args(args: &SelectArgs) -> RunConfig {
    let select = SelectConfig {
        selector: args.selector,
        n_constant: args.n_constant,
        min_n_components: args.min_states,
        max_n_components: args.max_states,
        n_iter: args.em_iters,
        tol: args.em_tol,
        n_folds: args.folds,
        random_state: args.seed,
        verbose: args.verbose,
        ..SelectConfig::default()
    };

    let corpus = match &args.input {
        Some(path) => CorpusSource::Csv(path.clone()),
        None => CorpusSource::Synthetic(SampleConfig {
            n_words: args.words,
            sequences_per_word: args.sequences,
            n_features: args.features,
            sample_seed: args.sample_seed,
            ..SampleConfig::default()
        }),
    };

    RunConfig {
        select,
        corpus,
        export_csv: args.export_csv.clone(),
        export_json: args.export_json.clone(),
        debug_bundle: args.debug_bundle,
    }
}

fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("select".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "select" | "sweep");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "select flags".
    if arg1.starts_with('-') {
        argv.insert(1, "select".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
