//! External source-separation tools
//!
//! Both models run out-of-process behind adapter traits so the pipeline can
//! be driven with fakes:
//! - [`StemSeparator`]: full-mix separation (demucs)
//! - [`DrumSeparator`]: drum sub-separation (drumsep)

pub mod drums;
pub mod full_mix;
pub mod models;
pub mod runner;
pub mod workdir;

pub use drums::{DrumSeparator, DrumsepSeparator, DRUM_MODEL_ID};
pub use full_mix::{DemucsSeparator, StemSeparator};
pub use runner::{ProcessRunner, ToolInvocation, ToolRunner};
pub use workdir::WorkingArea;
