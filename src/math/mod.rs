//! Mathematical utilities: log-domain Gaussian primitives.

pub mod gauss;

pub use gauss::{diag_gaussian_log_density, log_sum_exp};
