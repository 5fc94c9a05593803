//! Synthetic input data for demos and tests.

pub mod sample;

pub use sample::{SampleData, SampleFiles, SampleSpec, generate_sample, write_sample};
