//! Input/output helpers.
//!
//! - CSV discovery, concatenation and the mapping join (`ingest`)
//! - aggregate table exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
