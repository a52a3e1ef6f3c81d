//! Input/output helpers.
//!
//! - CSV corpus ingest + validation (`ingest`)
//! - per-word result exports (`export`)
//! - selection report JSON (`results`)

pub mod export;
pub mod ingest;
pub mod results;

pub use export::*;
pub use ingest::*;
pub use results::*;
