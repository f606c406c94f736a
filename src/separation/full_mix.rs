//! Full-mix separation (demucs)
//!
//! demucs writes `{out}/{model}/{input_basename}/{stem}.wav`. The adapter
//! runs the tool, confirms that folder exists, and copies each expected stem
//! into the output directory under its final name.

use super::models::{stem_label, stems_for_model};
use super::runner::{ToolInvocation, ToolRunner};
use crate::analysis::estimator::song_name;
use crate::error::{Result, StemsplitError};
use crate::naming::{stem_file_name, FilenameTemplate, FULL_TRACK_LABEL, OUTPUT_EXTENSION};
use crate::types::{StemRecord, TrackMetadata};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Full-mix separation backend
pub trait StemSeparator: Send + Sync {
    /// Separate `input` with `model`, writing under `temp_dir`
    ///
    /// # Returns
    /// The tool's raw output folder for this input. Any error is fatal to
    /// the run.
    fn separate(&self, input: &Path, model: &str, temp_dir: &Path) -> Result<PathBuf>;

    /// Backend name (for logging)
    fn name(&self) -> &'static str;
}

/// Raw output folder demucs uses for `input`
pub fn raw_output_dir(temp_dir: &Path, model: &str, input: &Path) -> PathBuf {
    temp_dir.join(model).join(song_name(input))
}

/// demucs run as an external process
pub struct DemucsSeparator {
    runner: Box<dyn ToolRunner>,
    program: String,
}

impl DemucsSeparator {
    pub fn new(runner: Box<dyn ToolRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    fn invocation(&self, input: &Path, model: &str, temp_dir: &Path) -> ToolInvocation {
        ToolInvocation::new("demucs", self.program.as_str())
            .arg("-n")
            .arg(model)
            .arg("--out")
            .arg(temp_dir)
            .arg(input)
    }
}

impl StemSeparator for DemucsSeparator {
    fn separate(&self, input: &Path, model: &str, temp_dir: &Path) -> Result<PathBuf> {
        self.runner.run(&self.invocation(input, model, temp_dir))?;

        let raw_dir = raw_output_dir(temp_dir, model, input);
        if !raw_dir.is_dir() {
            return Err(StemsplitError::OutputMissing {
                tool: "demucs".to_string(),
                path: raw_dir,
            });
        }
        debug!("demucs output located at {}", raw_dir.display());
        Ok(raw_dir)
    }

    fn name(&self) -> &'static str {
        "demucs"
    }
}

/// Copy plan for the full-mix stems and the original input
///
/// Stems missing from `raw_dir` are logged and left out of the plan.
pub fn plan_copies(
    raw_dir: &Path,
    model: &str,
    input: &Path,
    template: &FilenameTemplate,
    meta: &TrackMetadata,
    song_dir: &Path,
) -> Vec<StemRecord> {
    let mut records = Vec::new();

    for stem in stems_for_model(model) {
        let source_path = raw_dir.join(format!("{}.{}", stem, OUTPUT_EXTENSION));
        if !source_path.is_file() {
            warn!("Stem '{}' not produced by {}, skipping", stem, model);
            continue;
        }
        let stem_label = stem_label(stem);
        let dest_path = song_dir.join(stem_file_name(template, meta, &stem_label));
        records.push(StemRecord {
            stem_label,
            source_path,
            dest_path,
        });
    }

    records.push(StemRecord {
        stem_label: FULL_TRACK_LABEL.to_string(),
        source_path: input.to_path_buf(),
        dest_path: song_dir.join(stem_file_name(template, meta, FULL_TRACK_LABEL)),
    });

    records
}

/// Copy one record to its final name
///
/// Refuses to copy a file onto itself, which would truncate it.
pub fn copy_record(record: &StemRecord) -> Result<PathBuf> {
    if is_same_file(&record.source_path, &record.dest_path) {
        return Err(StemsplitError::OutputError {
            path: record.dest_path.clone(),
            reason: format!(
                "{} would overwrite its own source. Tip: choose an output directory other than the input's folder",
                record.stem_label
            ),
        });
    }
    std::fs::copy(&record.source_path, &record.dest_path)
        .map_err(|e| StemsplitError::output_error(&record.dest_path, e))?;
    info!("Saved {}", record.dest_path.display());
    Ok(record.dest_path.clone())
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copy every planned full-mix stem plus the original; any copy error is fatal
pub fn copy_stems(
    raw_dir: &Path,
    model: &str,
    input: &Path,
    template: &FilenameTemplate,
    meta: &TrackMetadata,
    song_dir: &Path,
) -> Result<Vec<PathBuf>> {
    plan_copies(raw_dir, model, input, template, meta, song_dir)
        .iter()
        .map(copy_record)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::separation::runner::testing::FakeRunner;
    use tempfile::TempDir;

    fn meta() -> TrackMetadata {
        TrackMetadata {
            song_name: "song".into(),
            key: "Am".into(),
            wheel_position: "8A".into(),
            tempo_bpm: 120,
        }
    }

    fn template() -> FilenameTemplate {
        FilenameTemplate::compile("{key} - {bpm}BPM - {name} - ({stem})").unwrap()
    }

    fn write_stems(raw_dir: &Path, stems: &[&str]) {
        std::fs::create_dir_all(raw_dir).unwrap();
        for stem in stems {
            std::fs::write(raw_dir.join(format!("{}.wav", stem)), stem.as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_invocation_arguments() {
        let separator = DemucsSeparator::new(Box::new(FakeRunner::succeeding()), "demucs");
        let invocation = separator.invocation(Path::new("/in/song.mp3"), "htdemucs_6s", Path::new("/tmp/stems"));
        assert_eq!(invocation.to_string(), "demucs -n htdemucs_6s --out /tmp/stems /in/song.mp3");
    }

    #[test]
    fn test_separate_locates_output() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new(|inv| {
            let out = PathBuf::from(&inv.args[3]);
            write_stems(&out.join("htdemucs").join("song"), &["vocals"]);
            Ok(())
        });
        let separator = DemucsSeparator::new(Box::new(runner), "demucs");

        let raw = separator
            .separate(Path::new("/in/song.mp3"), "htdemucs", temp.path())
            .unwrap();
        assert_eq!(raw, temp.path().join("htdemucs").join("song"));
    }

    #[test]
    fn test_missing_output_is_fatal() {
        let temp = TempDir::new().unwrap();
        let separator = DemucsSeparator::new(Box::new(FakeRunner::succeeding()), "demucs");
        let err = separator
            .separate(Path::new("/in/song.mp3"), "htdemucs", temp.path())
            .unwrap_err();
        assert!(matches!(err, StemsplitError::OutputMissing { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_tool_failure_propagates() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new(|inv| {
            Err(StemsplitError::ToolFailed {
                tool: inv.tool.clone(),
                status: "exit status: 1".into(),
                stderr: String::new(),
            })
        });
        let separator = DemucsSeparator::new(Box::new(runner), "demucs");
        let err = separator
            .separate(Path::new("/in/song.mp3"), "htdemucs", temp.path())
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_plan_skips_missing_stems_and_adds_full_track() {
        let temp = TempDir::new().unwrap();
        let raw = temp.path().join("raw");
        write_stems(&raw, &["vocals", "drums"]);
        let song_dir = temp.path().join("out");

        let plan = plan_copies(&raw, "htdemucs", Path::new("/in/song.mp3"), &template(), &meta(), &song_dir);
        let labels: Vec<_> = plan.iter().map(|r| r.stem_label.as_str()).collect();
        assert_eq!(labels, ["Drums", "Vocals", "Full Track"]);

        let full = plan.last().unwrap();
        assert_eq!(full.source_path, PathBuf::from("/in/song.mp3"));
        assert_eq!(full.dest_path, song_dir.join("Am - 120BPM - song - (Full Track).wav"));
    }

    #[test]
    fn test_copy_stems_writes_final_names() {
        let temp = TempDir::new().unwrap();
        let raw = temp.path().join("raw");
        write_stems(&raw, &["bass", "drums", "other", "vocals"]);
        let input = temp.path().join("song.flac");
        std::fs::write(&input, b"original").unwrap();
        let song_dir = temp.path().join("out");
        std::fs::create_dir_all(&song_dir).unwrap();

        let written = copy_stems(&raw, "htdemucs", &input, &template(), &meta(), &song_dir).unwrap();
        assert_eq!(written.len(), 5);
        assert_eq!(
            std::fs::read(song_dir.join("Am - 120BPM - song - (Vocals).wav")).unwrap(),
            b"vocals"
        );
        assert_eq!(
            std::fs::read(song_dir.join("Am - 120BPM - song - (Full Track).wav")).unwrap(),
            b"original"
        );
    }

    #[test]
    fn test_copy_into_missing_dir_is_output_error() {
        let temp = TempDir::new().unwrap();
        let raw = temp.path().join("raw");
        write_stems(&raw, &["vocals"]);
        let input = temp.path().join("song.wav");
        std::fs::write(&input, b"x").unwrap();

        let err = copy_stems(&raw, "htdemucs", &input, &template(), &meta(), &temp.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, StemsplitError::OutputError { .. }));
    }

    #[test]
    fn test_copy_onto_itself_is_refused() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("song.wav");
        std::fs::write(&input, b"original audio").unwrap();

        let record = StemRecord {
            stem_label: FULL_TRACK_LABEL.to_string(),
            source_path: input.clone(),
            dest_path: temp.path().join(".").join("song.wav"),
        };
        let err = copy_record(&record).unwrap_err();
        assert!(matches!(err, StemsplitError::OutputError { .. }));
        assert_eq!(std::fs::read(&input).unwrap(), b"original audio");
    }
}
