//! Out-of-process tool invocation
//!
//! Each external model runs as a blocking child process. No timeout, no
//! cancellation: the run waits for the tool to exit.

use crate::error::{Result, StemsplitError};
use indicatif::{ProgressBar, ProgressStyle};
use std::ffi::OsString;
use std::fmt;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, info};

/// Lines of tool stderr kept in error messages
const STDERR_TAIL_LINES: usize = 20;

/// A fully specified command line for one tool run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Tool name shown in logs and errors ("demucs", "drumsep")
    pub tool: String,
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl ToolInvocation {
    pub fn new(tool: impl Into<String>, program: impl Into<OsString>) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Executes tool invocations
pub trait ToolRunner: Send + Sync {
    /// Run to completion; `Ok` only for a zero exit status
    fn run(&self, invocation: &ToolInvocation) -> Result<()>;
}

/// Runs tools as child processes, with an optional spinner
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    show_progress: bool,
}

impl ProcessRunner {
    pub fn new(show_progress: bool) -> Self {
        Self { show_progress }
    }

    fn spinner(&self, tool: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Running {}...", tool));
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<()> {
        info!("Running {}", invocation);

        let spinner = self.spinner(&invocation.tool);
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let output = output.map_err(|e| StemsplitError::ToolLaunch {
            tool: invocation.tool.clone(),
            reason: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(StemsplitError::ToolFailed {
                tool: invocation.tool.clone(),
                status: output.status.to_string(),
                stderr: tail_lines(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL_LINES),
            });
        }

        debug!("{} finished ({})", invocation.tool, output.status);
        Ok(())
    }
}

fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(count)..].join("\n")
}
