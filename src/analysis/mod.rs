//! Audio analysis
//!
//! Tempo and key backends sit behind the [`BpmDetector`] and [`KeyDetector`]
//! traits; the [`Estimator`] combines them into per-run track metadata.

pub mod bpm;
pub mod estimator;
pub mod key;

pub use bpm::{BpmDetector, StratumBpmDetector};
pub use estimator::Estimator;
pub use key::{ChromaKeyDetector, KeyDetector};
