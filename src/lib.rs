//! stemsplit - Stem separation with key/BPM-aware naming
//!
//! Splits one song into labeled stems with demucs, splits the drum stem
//! further into kick, snare, hats and toms with drumsep, and names every
//! file after the song's detected key and tempo.
//!
//! # Architecture
//!
//! - `config`: CLI arguments and the YAML settings resolver
//! - `audio`: Audio decoding using symphonia
//! - `analysis`: Key and tempo estimation (with swappable backends)
//! - `naming`: Filename templates
//! - `separation`: Adapters for the external separation tools
//! - `pipeline`: Run orchestration
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use stemsplit::config::{Overrides, Resolver};
//! use stemsplit::pipeline;
//!
//! let config = Resolver::from_environment().resolve(&Overrides::default());
//! let outcome = pipeline::run(Path::new("song.mp3"), &config).expect("Invalid template");
//! println!("Success: {}", outcome.is_success());
//! ```

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod separation;
pub mod types;

// Re-export key types at crate root
pub use error::{Result, StemsplitError};
pub use types::{AudioBuffer, BpmResult, KeyResult, StemRecord, TrackMetadata};
