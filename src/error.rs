//! Unified error types for stemsplit
//!
//! Error strategy:
//! - Best-effort errors (decode, analysis, drum separation): logged, a safe
//!   default is substituted and the run continues
//! - Fatal errors (input missing, full-mix separation): abort the run
//! - Configuration errors: a malformed settings document falls back to
//!   defaults, a malformed filename template is surfaced immediately
//!
//! All errors include actionable suggestions where possible.

use std::path::PathBuf;
use thiserror::Error;

/// Supported audio formats for helpful error messages
pub const SUPPORTED_FORMATS: &str = "MP3, WAV, FLAC, AIFF, OGG";

/// Top-level error type for stemsplit operations
#[derive(Debug, Error)]
pub enum StemsplitError {
    // =========================================================================
    // Best-effort errors - substitute a default, continue the run
    // =========================================================================
    #[error("Failed to decode audio file '{path}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}\n  Tip: If the file plays in other apps, it may be corrupted or use an unsupported codec")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Analysis failed for '{path}': {reason}")]
    AnalysisError { path: PathBuf, reason: String },

    // =========================================================================
    // Fatal errors - abort the run
    // =========================================================================
    #[error("File not found: '{0}'\n  Tip: Check the path exists and is accessible")]
    FileNotFound(PathBuf),

    #[error("Could not launch {tool}: {reason}\n  Tip: Check that {tool} is installed and on your PATH (or set tools.demucs_bin in the config)")]
    ToolLaunch { tool: String, reason: String },

    #[error("{tool} exited with status {status}{}", format_stderr(.stderr))]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Expected output of {tool} not found at '{path}'\n  Tip: Check that the tool ran successfully and that the model name is correct")]
    OutputMissing { tool: String, path: PathBuf },

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    // =========================================================================
    // Configuration errors
    // =========================================================================
    #[error("Invalid filename template '{template}': {reason}\n  Placeholders: {{key}}, {{camelot}}, {{bpm}}, {{name}}, {{stem}}; write {{{{ or }}}} for literal braces")]
    TemplateError { template: String, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n  Error output: {}", trimmed)
    }
}

/// Result type alias for stemsplit operations
pub type Result<T> = std::result::Result<T, StemsplitError>;

impl StemsplitError {
    /// Returns true if this error is recoverable (substitute a default, continue the run)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StemsplitError::DecodeError { .. } | StemsplitError::AnalysisError { .. }
        )
    }

    /// Returns true if this error ends the run with nothing usable produced
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StemsplitError::FileNotFound(_)
                | StemsplitError::ToolLaunch { .. }
                | StemsplitError::ToolFailed { .. }
                | StemsplitError::OutputMissing { .. }
                | StemsplitError::OutputError { .. }
        )
    }

    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StemsplitError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a template error for the given template text
    pub fn template_error(template: impl Into<String>, reason: impl Into<String>) -> Self {
        StemsplitError::TemplateError {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!("Directory does not exist: {}", path.parent().map(|p| p.display().to_string()).unwrap_or_default())
            }
            _ => err.to_string(),
        };
        StemsplitError::OutputError { path, reason }
    }
}
