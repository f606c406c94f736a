//! Drum sub-separation (drumsep)
//!
//! drumsep is a demucs model run against the renamed drums stem. It writes
//! `{out}/49469ca8/{opaque}/{bombo,platillos,redoblante,toms}.wav`, where the
//! middle folder name is not under our control. Everything in this stage is
//! best-effort: failures are logged and the run keeps its full-mix stems.

use super::full_mix::copy_record;
use super::runner::{ToolInvocation, ToolRunner};
use super::workdir::WorkingArea;
use crate::error::Result;
use crate::naming::{stem_file_name, FilenameTemplate, OUTPUT_EXTENSION};
use crate::types::{StemRecord, TrackMetadata};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Folder name the drum model writes under the output directory
pub const DRUM_MODEL_ID: &str = "49469ca8";

/// Drum model part name → stem label
pub const DRUM_PARTS: [(&str, &str); 4] = [
    ("bombo", "Kick"),
    ("platillos", "Hats"),
    ("redoblante", "Snare-Clap"),
    ("toms", "Toms"),
];

/// Drum sub-separation backend
pub trait DrumSeparator: Send + Sync {
    /// Whether the model is installed
    fn is_available(&self) -> bool;

    /// Separate `drums_file`, writing under `output_dir`
    ///
    /// # Returns
    /// The model-id folder the tool writes into. It may be missing even on
    /// success; callers check.
    fn separate(&self, drums_file: &Path, output_dir: &Path) -> Result<PathBuf>;

    /// Backend name (for logging)
    fn name(&self) -> &'static str;
}

/// drumsep run through the demucs executable
pub struct DrumsepSeparator {
    runner: Box<dyn ToolRunner>,
    program: String,
    drumsep_dir: PathBuf,
}

impl DrumsepSeparator {
    pub fn new(runner: Box<dyn ToolRunner>, program: impl Into<String>, drumsep_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            program: program.into(),
            drumsep_dir: drumsep_dir.into(),
        }
    }

    fn model_repo(&self) -> PathBuf {
        self.drumsep_dir.join("model")
    }

    fn invocation(&self, drums_file: &Path, output_dir: &Path) -> ToolInvocation {
        ToolInvocation::new("drumsep", self.program.as_str())
            .arg("--repo")
            .arg(self.model_repo())
            .arg("-o")
            .arg(output_dir)
            .arg("-n")
            .arg(DRUM_MODEL_ID)
            .arg(drums_file)
    }
}

impl DrumSeparator for DrumsepSeparator {
    fn is_available(&self) -> bool {
        self.model_repo().is_dir()
    }

    fn separate(&self, drums_file: &Path, output_dir: &Path) -> Result<PathBuf> {
        self.runner.run(&self.invocation(drums_file, output_dir))?;
        Ok(output_dir.join(DRUM_MODEL_ID))
    }

    fn name(&self) -> &'static str {
        "drumsep"
    }
}

/// First immediate subdirectory of `dir` in file-name order
pub fn first_subfolder(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
}

/// Copy plan for the drum parts present in `parts_dir`
pub fn plan_part_copies(
    parts_dir: &Path,
    template: &FilenameTemplate,
    meta: &TrackMetadata,
    song_dir: &Path,
) -> Vec<StemRecord> {
    DRUM_PARTS
        .iter()
        .filter_map(|(part, label)| {
            let source_path = parts_dir.join(format!("{}.{}", part, OUTPUT_EXTENSION));
            if !source_path.is_file() {
                debug!("Drum part '{}' not produced, skipping", part);
                return None;
            }
            Some(StemRecord {
                stem_label: label.to_string(),
                source_path,
                dest_path: song_dir.join(stem_file_name(template, meta, label)),
            })
        })
        .collect()
}

/// Run the drum stage on `drums_file` and copy its parts into `song_dir`
///
/// Never fails: problems are logged and an empty or partial list returned.
/// The model-id folder is removed whenever it exists after the tool ran.
pub fn extract_drum_parts(
    separator: &dyn DrumSeparator,
    drums_file: &Path,
    template: &FilenameTemplate,
    meta: &TrackMetadata,
    song_dir: &Path,
) -> Vec<PathBuf> {
    info!("Separating drum parts with {}", separator.name());

    let invoked = separator.separate(drums_file, song_dir);
    let model_dir = match &invoked {
        Ok(dir) => dir.clone(),
        Err(_) => song_dir.join(DRUM_MODEL_ID),
    };

    let Some(area) = WorkingArea::adopt(&model_dir) else {
        match invoked {
            Ok(_) => warn!("Drum model output folder not found at {}", model_dir.display()),
            Err(e) => warn!("Drum separation failed: {}", e),
        }
        return Vec::new();
    };

    if let Err(e) = invoked {
        warn!("Drum separation failed: {}", e);
        close(area);
        return Vec::new();
    }

    let Some(parts_dir) = first_subfolder(area.path()) else {
        warn!("No output subfolder found in {}", area.path().display());
        close(area);
        return Vec::new();
    };

    let mut written = Vec::new();
    for record in plan_part_copies(&parts_dir, template, meta, song_dir) {
        match copy_record(&record) {
            Ok(path) => written.push(path),
            Err(e) => warn!("Failed to copy drum part {}: {}", record.stem_label, e),
        }
    }

    close(area);
    written
}

fn close(area: WorkingArea) {
    let path = area.path().to_path_buf();
    if let Err(e) = area.close() {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}
