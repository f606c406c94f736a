//! Pipeline orchestration
//!
//! One input song moves through a fixed sequence of stages:
//!
//! 1. Validate the input exists
//! 2. Estimate key/tempo (best-effort)
//! 3. Name the output folder
//! 4. Run the full-mix separator (fatal on failure)
//! 5. Copy the full-mix stems and the original
//! 6. Run the drum sub-separator and copy its parts (best-effort)
//! 7. Delete the full-mix working output
//! 8. Reveal the output folder
//!
//! Nothing is written to the song folder before the full-mix tool succeeds.

use super::reveal;
use crate::analysis::Estimator;
use crate::config::RunConfig;
use crate::error::{Result, StemsplitError};
use crate::naming::{self, stem_file_name, FilenameTemplate, FULL_TRACK_LABEL};
use crate::separation::drums::{self, DRUM_PARTS};
use crate::separation::full_mix;
use crate::separation::models::{is_known_model, stem_label, stems_for_model, DRUMS_STEM};
use crate::separation::{
    DemucsSeparator, DrumSeparator, DrumsepSeparator, ProcessRunner, StemSeparator, WorkingArea,
};
use crate::types::TrackMetadata;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Terminal state of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded {
        output_dir: PathBuf,
        metadata: TrackMetadata,
        /// Full-mix stems plus the full-track copy
        stems: Vec<PathBuf>,
        drum_parts: Vec<PathBuf>,
    },
    /// Dry run: what would have been written
    Planned {
        output_dir: PathBuf,
        metadata: TrackMetadata,
        files: Vec<PathBuf>,
    },
    Failed {
        reason: String,
    },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, RunOutcome::Failed { .. })
    }

    fn failed(err: StemsplitError) -> Self {
        RunOutcome::Failed {
            reason: err.to_string(),
        }
    }
}

/// The tools one run is wired to
pub struct Toolset {
    pub estimator: Estimator,
    pub separator: Box<dyn StemSeparator>,
    pub drums: Box<dyn DrumSeparator>,
}

impl Toolset {
    /// Real tools, launched as child processes
    pub fn from_config(config: &RunConfig) -> Self {
        let runner = || Box::new(ProcessRunner::new(config.show_progress));
        Self {
            estimator: Estimator::default(),
            separator: Box::new(DemucsSeparator::new(runner(), config.demucs_bin.as_str())),
            drums: Box::new(DrumsepSeparator::new(
                runner(),
                config.demucs_bin.as_str(),
                &config.drumsep_dir,
            )),
        }
    }
}

/// Run the pipeline on `input` with the real external tools
pub fn run(input: &Path, config: &RunConfig) -> Result<RunOutcome> {
    run_with(input, config, &Toolset::from_config(config))
}

/// Run the pipeline with the given tools
///
/// Returns `Err` only for configuration problems (a malformed filename
/// template). Every other failure ends in [`RunOutcome::Failed`].
pub fn run_with(input: &Path, config: &RunConfig, tools: &Toolset) -> Result<RunOutcome> {
    let started = Instant::now();
    let template = FilenameTemplate::compile(&config.filename_template)?;

    if !input.is_file() {
        return Ok(RunOutcome::failed(StemsplitError::FileNotFound(input.to_path_buf())));
    }
    let input = absolute(input);

    info!("Estimating key and tempo...");
    let metadata = tools.estimator.estimate_or_unknown(&input);
    info!("Track: {} ({})", metadata.song_name, metadata);

    let song_dir = song_dir(config, &template, &metadata)?;

    if !is_known_model(&config.model_selector) {
        warn!(
            "Unknown model '{}', expecting the default stems: {}",
            config.model_selector,
            stems_for_model(&config.model_selector).join(", ")
        );
    }

    if config.dry_run {
        let files = planned_files(config, &template, &metadata, &song_dir);
        print_plan(&input, config, &song_dir, &files);
        return Ok(RunOutcome::Planned {
            output_dir: song_dir,
            metadata,
            files,
        });
    }

    // The output tree stays untouched until the full-mix tool succeeds
    if let Err(e) = std::fs::create_dir_all(&config.temp_dir) {
        return Ok(RunOutcome::failed(StemsplitError::output_error(&config.temp_dir, e)));
    }

    info!(
        "Separating stems with {} ({})",
        tools.separator.name(),
        config.model_selector
    );
    let raw_dir = match tools
        .separator
        .separate(&input, &config.model_selector, &config.temp_dir)
    {
        Ok(dir) => dir,
        Err(e) => return Ok(RunOutcome::failed(e)),
    };
    let Some(raw_area) = WorkingArea::adopt(&raw_dir) else {
        return Ok(RunOutcome::failed(StemsplitError::OutputMissing {
            tool: tools.separator.name().to_string(),
            path: raw_dir,
        }));
    };

    if let Err(e) = std::fs::create_dir_all(&song_dir) {
        return Ok(RunOutcome::failed(StemsplitError::output_error(&song_dir, e)));
    }

    let stems = match full_mix::copy_stems(
        raw_area.path(),
        &config.model_selector,
        &input,
        &template,
        &metadata,
        &song_dir,
    ) {
        Ok(stems) => stems,
        Err(e) => return Ok(RunOutcome::failed(e)),
    };

    let drum_parts = run_drum_stage(tools.drums.as_ref(), &template, &metadata, &song_dir);

    let raw_path = raw_area.path().to_path_buf();
    if let Err(e) = raw_area.close() {
        warn!("Failed to remove working folder {}: {}", raw_path.display(), e);
    }

    info!(
        "Finished {} in {:.1}s",
        metadata.song_name,
        started.elapsed().as_secs_f64()
    );

    if config.reveal_output {
        reveal::reveal(&song_dir);
    }

    Ok(RunOutcome::Succeeded {
        output_dir: song_dir,
        metadata,
        stems,
        drum_parts,
    })
}

/// Folder receiving this song's files
fn song_dir(config: &RunConfig, template: &FilenameTemplate, metadata: &TrackMetadata) -> Result<PathBuf> {
    if !config.organize_by_song {
        return Ok(config.output_dir.clone());
    }
    let folder = naming::song_folder_name(template, metadata, config.include_key_bpm)?;
    Ok(config.output_dir.join(folder))
}

fn run_drum_stage(
    separator: &dyn DrumSeparator,
    template: &FilenameTemplate,
    metadata: &TrackMetadata,
    song_dir: &Path,
) -> Vec<PathBuf> {
    if !separator.is_available() {
        warn!("{} model not installed, skipping drum separation", separator.name());
        return Vec::new();
    }

    let drums_file = song_dir.join(stem_file_name(template, metadata, &stem_label(DRUMS_STEM)));
    if !drums_file.is_file() {
        warn!("No drums stem at {}, skipping drum separation", drums_file.display());
        return Vec::new();
    }

    debug!("Drum stage input: {}", drums_file.display());
    drums::extract_drum_parts(separator, &drums_file, template, metadata, song_dir)
}

/// Every file a real run would try to write
fn planned_files(
    config: &RunConfig,
    template: &FilenameTemplate,
    metadata: &TrackMetadata,
    song_dir: &Path,
) -> Vec<PathBuf> {
    let stem_labels = stems_for_model(&config.model_selector)
        .iter()
        .map(|stem| stem_label(stem))
        .chain(std::iter::once(FULL_TRACK_LABEL.to_string()))
        .chain(DRUM_PARTS.iter().map(|(_, label)| label.to_string()));

    stem_labels
        .map(|label| song_dir.join(stem_file_name(template, metadata, &label)))
        .collect()
}

fn print_plan(input: &Path, config: &RunConfig, song_dir: &Path, files: &[PathBuf]) {
    println!();
    println!("=== DRY RUN MODE ===");
    println!();
    println!("Input:  {}", input.display());
    println!("Model:  {}", config.model_selector);
    println!("Output: {}/", song_dir.display());
    for file in files {
        let name = file.file_name().unwrap_or_default().to_string_lossy();
        println!("  {}", name);
    }
    println!();
    println!("Drum parts are written only if the drumsep model is installed");
    println!("({}).", config.drumsep_model_dir().display());
    println!();
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
