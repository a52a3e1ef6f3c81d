//! Model fitting (EM) and state-count selection.

pub mod fitter;
pub mod selection;
