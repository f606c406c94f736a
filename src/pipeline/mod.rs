//! Run coordination

pub mod orchestrator;
pub mod reveal;

pub use orchestrator::{run, run_with, RunOutcome, Toolset};
