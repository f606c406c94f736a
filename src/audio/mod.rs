//! Audio decoding

pub mod decoder;

pub use decoder::{decode, ANALYSIS_SAMPLE_RATE};
