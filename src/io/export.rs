//! Export per-word selection results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts (one row per word).

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::AppError;
use crate::fit::selection::StateSelection;

/// Write per-word selection results to a CSV file.
pub fn write_results_csv(path: &Path, selections: &[StateSelection]) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::config(format!(
            "Failed to create export CSV '{}': {e}",
            path.display()
        ))
    })?;

    writeln!(
        file,
        "word,selector,chosen_states,score,log_likelihood,em_iterations,converged,fallback"
    )
    .map_err(|e| AppError::config(format!("Failed to write export CSV header: {e}")))?;

    for s in selections {
        let score = s
            .chosen_score()
            .map(|v| format!("{v:.6}"))
            .unwrap_or_default();
        let (ll, iters, converged) = match &s.model {
            Some(fit) => (
                format!("{:.6}", fit.log_likelihood),
                fit.iterations.to_string(),
                fit.converged.to_string(),
            ),
            None => (String::new(), String::new(), String::new()),
        };
        writeln!(
            file,
            "{},{},{},{},{},{},{},{}",
            s.word,
            s.selector.display_name(),
            s.chosen_states,
            score,
            ll,
            iters,
            converged,
            s.fallback.as_deref().unwrap_or(""),
        )
        .map_err(|e| AppError::config(format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}
