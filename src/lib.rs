//! `sales-deck` library crate.
//!
//! The binary (`sales-deck`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes
//! - charts, tables and the deck writer are usable on their own
//! - each stage stays in its own module

pub mod analysis;
pub mod app;
pub mod chart;
pub mod cli;
pub mod config;
pub mod data;
pub mod deck;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
