//! Reporting utilities: formatted terminal output for selection runs.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

pub mod format;

pub use format::{format_run_summary, format_sweep};
