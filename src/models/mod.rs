//! Gaussian HMM model representation and likelihood scoring.

pub mod model;

pub use model::GaussianHmm;
