//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw spreadsheet rows (`TransactionRow`, `ProductMapping`)
//! - the enriched record (`Sale`)
//! - grouping vocabulary (`Dimension`, `Metric`, `KeyValue`)

pub mod types;

pub use types::*;
