//! # Formats Module
//!
//! Interchange formats for filtergraph data.
//!
//! File I/O is in the app layer; this module only converts bytes.

pub mod dataset;

pub use dataset::{Dataset, MAX_DATASET_SIZE};
