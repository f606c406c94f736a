//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;

/// stemsplit - Split a song into named stems with key and BPM detection
///
/// Runs demucs on the input song, splits the drum stem further into kick,
/// snare, hats and toms, and names every file after the detected key and
/// tempo.
#[derive(Parser, Debug)]
#[command(name = "stemsplit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Audio file to process
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Path to the YAML settings file (defaults to config.yaml next to the executable)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the output directory
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Override the demucs model (e.g. htdemucs, htdemucs_6s, mdx_extra)
    #[arg(short, long, value_name = "NAME")]
    pub model: Option<String>,

    /// Do not open the output folder when finished
    #[arg(long, default_value = "false")]
    pub no_open: bool,

    /// Dry run - show the files that would be written without running any tool
    #[arg(long, default_value = "false")]
    pub dry_run: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress spinners and non-error logs)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

impl Cli {
    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
