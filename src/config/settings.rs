//! Settings document and run configuration
//!
//! The settings document is a YAML file with three sections:
//!
//! ```yaml
//! paths:
//!   temp_dir: ~/BestStemSplitterEver/temp
//!   output_dir: ~/Music/Stems
//! tools:
//!   drumsep_dir: ./drumsep
//!   demucs_model: htdemucs_6s
//!   demucs_bin: demucs
//! output:
//!   organize_by_song: true
//!   include_key_bpm: true
//!   filename_format: "{key} - {bpm}BPM - {name} - ({stem})"
//! ```
//!
//! [`Resolver`] merges that document with command-line overrides into an
//! immutable [`RunConfig`].

use crate::config::cli::Cli;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the install location
pub const HOME_ENV_VAR: &str = "STEMSPLIT_HOME";

/// File name of the settings document inside the install location
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default filename template
pub const DEFAULT_FILENAME_FORMAT: &str = "{key} - {bpm}BPM - {name} - ({stem})";

/// Default demucs model
pub const DEFAULT_MODEL: &str = "htdemucs_6s";

// =============================================================================
// Settings document
// =============================================================================

/// `paths` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub temp_dir: String,
    pub output_dir: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            temp_dir: "~/BestStemSplitterEver/temp".to_string(),
            output_dir: "~/Music/Stems".to_string(),
        }
    }
}

/// `tools` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// Drumsep checkout; relative paths are resolved against the install location
    pub drumsep_dir: String,
    pub demucs_model: String,
    /// Program used to launch demucs
    pub demucs_bin: String,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            drumsep_dir: "./drumsep".to_string(),
            demucs_model: DEFAULT_MODEL.to_string(),
            demucs_bin: "demucs".to_string(),
        }
    }
}

/// `output` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub organize_by_song: bool,
    pub include_key_bpm: bool,
    pub filename_format: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            organize_by_song: true,
            include_key_bpm: true,
            filename_format: DEFAULT_FILENAME_FORMAT.to_string(),
        }
    }
}

/// The persisted settings document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDocument {
    pub paths: PathsSection,
    pub tools: ToolsSection,
    pub output: OutputSection,
}

// =============================================================================
// Run configuration
// =============================================================================

/// Fully resolved configuration for one run
///
/// Created by [`Resolver::resolve`] and consumed read-only afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Scratch root handed to demucs
    pub temp_dir: PathBuf,
    /// Root of the output contract
    pub output_dir: PathBuf,
    /// demucs model name
    pub model_selector: String,
    /// Put each song's stems in their own folder
    pub organize_by_song: bool,
    /// Name the song folder after the key/BPM template
    pub include_key_bpm: bool,
    /// Filename template, compiled at the start of each run
    pub filename_template: String,
    /// Absolute drumsep checkout directory
    pub drumsep_dir: PathBuf,
    /// Program used to launch demucs
    pub demucs_bin: String,
    /// Open the output folder when finished
    pub reveal_output: bool,
    /// Show spinners while external tools run
    pub show_progress: bool,
    /// Plan only, run no tools
    pub dry_run: bool,
}

impl RunConfig {
    /// Resolve configuration from CLI arguments using the process environment
    pub fn from_cli(cli: &Cli) -> Self {
        let overrides = Overrides {
            config_path: cli.config.clone(),
            output_dir: cli.output.clone(),
            model: cli.model.clone(),
        };

        let mut config = Resolver::from_environment().resolve(&overrides);
        config.reveal_output = !cli.no_open;
        config.show_progress = !cli.quiet;
        config.dry_run = cli.dry_run;
        config
    }

    /// Directory the drum model weights are loaded from
    pub fn drumsep_model_dir(&self) -> PathBuf {
        self.drumsep_dir.join("model")
    }
}

/// Caller-supplied overrides; each one wins over the settings document
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub model: Option<String>,
}

// =============================================================================
// Resolver
// =============================================================================

/// Merges the settings document with overrides into a [`RunConfig`]
#[derive(Debug, Clone)]
pub struct Resolver {
    install_dir: PathBuf,
    home_dir: Option<PathBuf>,
}

impl Resolver {
    pub fn new(install_dir: impl Into<PathBuf>, home_dir: Option<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
            home_dir,
        }
    }

    /// Resolver rooted at the running executable (or `STEMSPLIT_HOME`)
    pub fn from_environment() -> Self {
        let home_dir = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
        Self::new(install_dir(), home_dir)
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Default settings document location
    pub fn default_config_path(&self) -> PathBuf {
        self.install_dir.join(CONFIG_FILE_NAME)
    }

    /// Resolve a full run configuration
    pub fn resolve(&self, overrides: &Overrides) -> RunConfig {
        let config_path = overrides
            .config_path
            .clone()
            .unwrap_or_else(|| self.default_config_path());
        let document = self.load_document(&config_path);

        let output_dir = match &overrides.output_dir {
            Some(dir) => absolutize(dir),
            None => self.expand_home(&document.paths.output_dir),
        };

        let model_selector = match &overrides.model {
            Some(model) => {
                info!("Overriding demucs model to: {}", model);
                model.clone()
            }
            None => document.tools.demucs_model.clone(),
        };

        let config = RunConfig {
            temp_dir: self.expand_home(&document.paths.temp_dir),
            output_dir,
            model_selector,
            organize_by_song: document.output.organize_by_song,
            include_key_bpm: document.output.include_key_bpm,
            filename_template: document.output.filename_format.clone(),
            drumsep_dir: self.resolve_tool_dir(&document.tools.drumsep_dir),
            demucs_bin: document.tools.demucs_bin.clone(),
            reveal_output: true,
            show_progress: true,
            dry_run: false,
        };

        debug!("Resolved run configuration: {:?}", config);
        config
    }

    /// Load the settings document, falling back to defaults
    ///
    /// A missing document is replaced by the defaults, which are also written
    /// to `path` for later editing. A malformed document is left untouched.
    pub fn load_document(&self, path: &Path) -> SettingsDocument {
        if !path.exists() {
            warn!("Config file not found at {}, using defaults", path.display());
            let document = SettingsDocument::default();
            match save_document(&document, path) {
                Ok(()) => info!("Created default config at {}", path.display()),
                Err(e) => warn!("Could not create default config at {}: {}", path.display(), e),
            }
            return document;
        }

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file {}: {}, using defaults", path.display(), e);
                return SettingsDocument::default();
            }
        };

        match serde_yaml::from_str::<SettingsDocument>(&contents) {
            Ok(document) => {
                info!("Loaded configuration from {}", path.display());
                document
            }
            Err(e) => {
                warn!("Error loading config file {}: {}, using defaults", path.display(), e);
                SettingsDocument::default()
            }
        }
    }

    /// Expand a leading `~` against the home directory
    fn expand_home(&self, raw: &str) -> PathBuf {
        let rest = if raw == "~" {
            Some("")
        } else {
            raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\"))
        };

        match (rest, &self.home_dir) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(raw),
        }
    }

    /// Resolve a tool location: `~` against home, relative against the install dir
    fn resolve_tool_dir(&self, raw: &str) -> PathBuf {
        if raw.starts_with('~') {
            return self.expand_home(raw);
        }
        let path = Path::new(raw);
        if path.is_absolute() {
            normalize_lexically(path)
        } else {
            normalize_lexically(&self.install_dir.join(path))
        }
    }
}

/// Write a settings document as YAML, creating parent directories
pub fn save_document(document: &SettingsDocument, path: &Path) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let yaml = serde_yaml::to_string(document)
        .map_err(|e| crate::StemsplitError::ConfigError(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Directory of the running executable, or `STEMSPLIT_HOME` when set
pub fn install_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(HOME_ENV_VAR) {
        return PathBuf::from(dir);
    }

    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize_lexically(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize_lexically(&cwd.join(path)),
        Err(_) => path.to_path_buf(),
    }
}

/// Remove `.` and resolve `..` components without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
