//! Integration tests for the stemsplit pipeline
//!
//! The external separation tools are replaced by fakes that write the same
//! directory layouts the real tools produce.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use stemsplit::analysis::estimator::song_name;
use stemsplit::analysis::{BpmDetector, ChromaKeyDetector, Estimator, KeyDetector, StratumBpmDetector};
use stemsplit::config::RunConfig;
use stemsplit::pipeline::{self, RunOutcome, Toolset};
use stemsplit::separation::{DrumSeparator, StemSeparator, DRUM_MODEL_ID};
use stemsplit::types::{AudioBuffer, BpmResult, KeyResult, Mode, PitchClass};
use stemsplit::{audio, StemsplitError, TrackMetadata};
use tempfile::TempDir;

const TEMPLATE: &str = "{key} - {bpm}BPM - {name} - ({stem})";

// =============================================================================
// Signal generators
// =============================================================================

/// Generate a mono 16-bit WAV file summing equal-amplitude sine tones
fn generate_chord_wav(path: &Path, frequencies: &[f32], duration_secs: f32, sample_rate: u32) {
    use std::f32::consts::PI;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV file");

    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let amplitude = 0.5f32 / frequencies.len() as f32;

    for i in 0..num_samples {
        let t = i as f32 / sample_rate as f32;
        let sample: f32 = frequencies
            .iter()
            .map(|f| (2.0 * PI * f * t).sin() * amplitude)
            .sum();
        writer
            .write_sample((sample * 32767.0) as i16)
            .expect("Failed to write sample");
    }

    writer.finalize().expect("Failed to finalize WAV");
}

/// Generate a click track WAV file for tempo testing
///
/// Short exponentially decaying impulses at every beat.
fn generate_click_track(path: &Path, bpm: f32, duration_secs: f32, sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV file");

    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let samples_per_beat = (60.0 / bpm * sample_rate as f32) as usize;
    let impulse_samples = (0.005 * sample_rate as f32) as usize;

    for i in 0..num_samples {
        let position_in_beat = i % samples_per_beat;
        let sample = if position_in_beat < impulse_samples {
            let decay = (-5.0 * position_in_beat as f32 / impulse_samples as f32).exp();
            0.8 * decay
        } else {
            0.0
        };
        writer
            .write_sample((sample * 32767.0) as i16)
            .expect("Failed to write sample");
    }

    writer.finalize().expect("Failed to finalize WAV");
}

/// Check if detected BPM matches target, allowing for half/double time
fn is_bpm_match(detected: f64, target: f64, tolerance: f64) -> bool {
    [detected, detected * 2.0, detected / 2.0]
        .iter()
        .any(|candidate| (candidate - target).abs() <= tolerance)
}

// =============================================================================
// Fake backends
// =============================================================================

struct FixedTempo(f64);

impl BpmDetector for FixedTempo {
    fn detect(&self, _: &AudioBuffer) -> stemsplit::Result<BpmResult> {
        Ok(BpmResult {
            value: self.0,
            confidence: 1.0,
        })
    }

    fn name(&self) -> &'static str {
        "fixed-tempo"
    }
}

struct FixedKey(PitchClass, Mode, &'static str);

impl KeyDetector for FixedKey {
    fn detect(&self, _: &AudioBuffer) -> stemsplit::Result<KeyResult> {
        Ok(KeyResult {
            pitch_class: self.0,
            mode: self.1,
            camelot: self.2.to_string(),
            score: 1.0,
        })
    }

    fn name(&self) -> &'static str {
        "fixed-key"
    }
}

/// Writes `{temp}/{model}/{song}/{stem}.wav` like demucs
struct FakeDemucs {
    stems: Vec<&'static str>,
    fail: bool,
}

impl StemSeparator for FakeDemucs {
    fn separate(&self, input: &Path, model: &str, temp_dir: &Path) -> stemsplit::Result<PathBuf> {
        if self.fail {
            return Err(StemsplitError::ToolFailed {
                tool: "demucs".into(),
                status: "exit status: 1".into(),
                stderr: "CUDA out of memory".into(),
            });
        }
        let raw_dir = temp_dir.join(model).join(song_name(input));
        fs::create_dir_all(&raw_dir)?;
        for stem in &self.stems {
            fs::write(raw_dir.join(format!("{}.wav", stem)), stem.as_bytes())?;
        }
        Ok(raw_dir)
    }

    fn name(&self) -> &'static str {
        "fake-demucs"
    }
}

/// Writes `{out}/49469ca8/{subfolder}/{part}.wav` like drumsep
struct FakeDrumsep {
    available: bool,
    subfolders: Vec<(&'static str, Vec<&'static str>)>,
}

impl DrumSeparator for FakeDrumsep {
    fn is_available(&self) -> bool {
        self.available
    }

    fn separate(&self, drums_file: &Path, output_dir: &Path) -> stemsplit::Result<PathBuf> {
        assert!(drums_file.is_file(), "drum stage must get the renamed drums stem");
        let model_dir = output_dir.join(DRUM_MODEL_ID);
        fs::create_dir_all(&model_dir)?;
        for (folder, parts) in &self.subfolders {
            fs::create_dir_all(model_dir.join(folder))?;
            for part in parts {
                fs::write(model_dir.join(folder).join(format!("{}.wav", part)), part.as_bytes())?;
            }
        }
        Ok(model_dir)
    }

    fn name(&self) -> &'static str {
        "fake-drumsep"
    }
}

const SIX_STEMS: [&str; 6] = ["bass", "drums", "other", "vocals", "piano", "guitar"];
const DRUM_PARTS: [&str; 4] = ["bombo", "platillos", "redoblante", "toms"];

fn fixed_estimator() -> Estimator {
    Estimator::new(
        Box::new(FixedTempo(120.2)),
        Box::new(FixedKey(PitchClass::A, Mode::Minor, "8A")),
    )
}

fn toolset(demucs: FakeDemucs, drums: FakeDrumsep) -> Toolset {
    Toolset {
        estimator: fixed_estimator(),
        separator: Box::new(demucs),
        drums: Box::new(drums),
    }
}

/// Create a test configuration with spinners and reveal disabled
fn create_test_config(root: &Path) -> RunConfig {
    RunConfig {
        temp_dir: root.join("temp"),
        output_dir: root.join("Stems"),
        model_selector: "htdemucs_6s".into(),
        organize_by_song: true,
        include_key_bpm: true,
        filename_template: TEMPLATE.into(),
        drumsep_dir: root.join("drumsep"),
        demucs_bin: "demucs".into(),
        reveal_output: false,
        show_progress: false,
        dry_run: false,
    }
}

/// A 4 second input song in its own directory
fn create_input(root: &Path) -> PathBuf {
    let input_dir = root.join("input");
    fs::create_dir_all(&input_dir).unwrap();
    let input = input_dir.join("song.wav");
    generate_chord_wav(&input, &[440.0, 523.25, 659.25], 4.0, 44100);
    input
}

fn file_names(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .expect("Failed to read directory")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn expected_names(labels: &[&str]) -> BTreeSet<String> {
    labels
        .iter()
        .map(|label| format!("Am - 120BPM - song - ({}).wav", label))
        .collect()
}

/// Fields of a successful run
struct Success {
    output_dir: PathBuf,
    metadata: TrackMetadata,
    stems: Vec<PathBuf>,
    drum_parts: Vec<PathBuf>,
}

fn expect_success(outcome: RunOutcome) -> Success {
    match outcome {
        RunOutcome::Succeeded {
            output_dir,
            metadata,
            stems,
            drum_parts,
        } => Success {
            output_dir,
            metadata,
            stems,
            drum_parts,
        },
        other => panic!("Expected success, got {:?}", other),
    }
}

// =============================================================================
// Pipeline
// =============================================================================

#[test]
fn test_full_run_with_six_stem_model() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let input = create_input(root.path());
    let config = create_test_config(root.path());

    let tools = toolset(
        FakeDemucs {
            stems: SIX_STEMS.to_vec(),
            fail: false,
        },
        FakeDrumsep {
            available: true,
            subfolders: vec![("drums", DRUM_PARTS.to_vec())],
        },
    );

    let outcome = pipeline::run_with(&input, &config, &tools).expect("Pipeline should run");
    let Success {
        output_dir,
        metadata,
        stems,
        drum_parts,
    } = expect_success(outcome);

    assert_eq!(output_dir, root.path().join("Stems").join("Am - 120BPM - song"));
    assert_eq!(metadata.key, "Am");
    assert_eq!(metadata.wheel_position, "8A");
    assert_eq!(stems.len(), 7, "6 stems plus the full track");
    assert_eq!(drum_parts.len(), 4);

    assert_eq!(
        file_names(&output_dir),
        expected_names(&[
            "Bass", "Drums", "Other", "Vocals", "Piano", "Guitar", "Full Track", "Kick", "Hats",
            "Snare-Clap", "Toms",
        ])
    );

    // Full track is a byte copy of the input
    assert_eq!(
        fs::read(output_dir.join("Am - 120BPM - song - (Full Track).wav")).unwrap(),
        fs::read(&input).unwrap()
    );
    assert_eq!(
        fs::read_to_string(output_dir.join("Am - 120BPM - song - (Snare-Clap).wav")).unwrap(),
        "redoblante"
    );

    // Working output removed, model folder kept
    assert!(!root.path().join("temp/htdemucs_6s/song").exists());
    assert!(root.path().join("temp/htdemucs_6s").exists());
    assert!(!output_dir.join(DRUM_MODEL_ID).exists());
}

#[test]
fn test_full_mix_failure_leaves_no_output() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let input = create_input(root.path());
    let config = create_test_config(root.path());

    let tools = toolset(
        FakeDemucs {
            stems: vec![],
            fail: true,
        },
        FakeDrumsep {
            available: true,
            subfolders: vec![],
        },
    );

    let outcome = pipeline::run_with(&input, &config, &tools).expect("Pipeline should run");
    match outcome {
        RunOutcome::Failed { reason } => assert!(reason.contains("CUDA out of memory")),
        other => panic!("Expected failure, got {:?}", other),
    }

    assert!(!config.output_dir.exists());
}

#[test]
fn test_zero_drum_subfolders_keeps_full_mix_stems() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let input = create_input(root.path());
    let mut config = create_test_config(root.path());
    config.model_selector = "htdemucs".into();

    let tools = toolset(
        FakeDemucs {
            stems: vec!["bass", "drums", "other", "vocals"],
            fail: false,
        },
        FakeDrumsep {
            available: true,
            subfolders: vec![],
        },
    );

    let outcome = pipeline::run_with(&input, &config, &tools).expect("Pipeline should run");
    let Success { output_dir, drum_parts, .. } = expect_success(outcome);

    assert!(drum_parts.is_empty());
    assert_eq!(
        file_names(&output_dir),
        expected_names(&["Bass", "Drums", "Other", "Vocals", "Full Track"])
    );
    assert!(!output_dir.join(DRUM_MODEL_ID).exists());
}

#[test]
fn test_missing_stem_is_skipped() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let input = create_input(root.path());
    let config = create_test_config(root.path());

    // No guitar, no drums: the drum stage is skipped too
    let tools = toolset(
        FakeDemucs {
            stems: vec!["bass", "other", "vocals", "piano"],
            fail: false,
        },
        FakeDrumsep {
            available: true,
            subfolders: vec![("drums", DRUM_PARTS.to_vec())],
        },
    );

    let outcome = pipeline::run_with(&input, &config, &tools).expect("Pipeline should run");
    let Success { output_dir, .. } = expect_success(outcome);

    assert_eq!(
        file_names(&output_dir),
        expected_names(&["Bass", "Other", "Vocals", "Piano", "Full Track"])
    );
}

#[test]
fn test_unavailable_drum_model_is_skipped() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let input = create_input(root.path());
    let config = create_test_config(root.path());

    let tools = toolset(
        FakeDemucs {
            stems: SIX_STEMS.to_vec(),
            fail: false,
        },
        FakeDrumsep {
            available: false,
            subfolders: vec![("drums", DRUM_PARTS.to_vec())],
        },
    );

    let outcome = pipeline::run_with(&input, &config, &tools).expect("Pipeline should run");
    let Success { stems, drum_parts, .. } = expect_success(outcome);
    assert_eq!(stems.len(), 7);
    assert!(drum_parts.is_empty());
}

#[test]
fn test_flat_layout_without_song_folder() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let input = create_input(root.path());
    let mut config = create_test_config(root.path());
    config.organize_by_song = false;

    let tools = toolset(
        FakeDemucs {
            stems: SIX_STEMS.to_vec(),
            fail: false,
        },
        FakeDrumsep {
            available: true,
            subfolders: vec![("drums", vec!["bombo"])],
        },
    );

    let outcome = pipeline::run_with(&input, &config, &tools).expect("Pipeline should run");
    let Success { output_dir, .. } = expect_success(outcome);
    assert_eq!(output_dir, root.path().join("Stems"));
    assert!(output_dir.join("Am - 120BPM - song - (Kick).wav").exists());
}

#[test]
fn test_missing_input_fails() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(root.path());
    let tools = toolset(
        FakeDemucs {
            stems: SIX_STEMS.to_vec(),
            fail: false,
        },
        FakeDrumsep {
            available: true,
            subfolders: vec![],
        },
    );

    let outcome = pipeline::run_with(&root.path().join("ghost.mp3"), &config, &tools)
        .expect("Pipeline should run");
    match outcome {
        RunOutcome::Failed { reason } => assert!(reason.contains("File not found")),
        other => panic!("Expected failure, got {:?}", other),
    }
    assert!(!root.path().join("Stems").exists());
}

#[test]
fn test_malformed_template_is_surfaced() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let input = create_input(root.path());
    let mut config = create_test_config(root.path());
    config.filename_template = "{key} - {genre}".into();

    let tools = toolset(
        FakeDemucs {
            stems: SIX_STEMS.to_vec(),
            fail: false,
        },
        FakeDrumsep {
            available: true,
            subfolders: vec![],
        },
    );

    let err = pipeline::run_with(&input, &config, &tools).unwrap_err();
    assert!(matches!(err, StemsplitError::TemplateError { .. }));
    assert!(!root.path().join("temp").exists());
}

#[test]
fn test_dry_run_writes_nothing() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let input = create_input(root.path());
    let mut config = create_test_config(root.path());
    config.dry_run = true;

    let tools = toolset(
        FakeDemucs {
            stems: SIX_STEMS.to_vec(),
            fail: false,
        },
        FakeDrumsep {
            available: true,
            subfolders: vec![],
        },
    );

    let outcome = pipeline::run_with(&input, &config, &tools).expect("Pipeline should run");
    match outcome {
        RunOutcome::Planned { files, .. } => assert_eq!(files.len(), 11),
        other => panic!("Expected a plan, got {:?}", other),
    }
    assert!(!root.path().join("Stems").exists());
    assert!(!root.path().join("temp").exists());
}

#[test]
fn test_estimation_failure_uses_unknown_metadata() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let input = root.path().join("song.mp3");
    fs::write(&input, b"definitely not audio").unwrap();
    let config = create_test_config(root.path());

    let tools = Toolset {
        estimator: Estimator::default(),
        separator: Box::new(FakeDemucs {
            stems: vec!["vocals"],
            fail: false,
        }),
        drums: Box::new(FakeDrumsep {
            available: false,
            subfolders: vec![],
        }),
    };

    let outcome = pipeline::run_with(&input, &config, &tools).expect("Pipeline should run");
    let Success { output_dir, metadata, .. } = expect_success(outcome);

    assert_eq!(metadata, TrackMetadata::unknown("song"));
    assert_eq!(output_dir, root.path().join("Stems").join("Unknown - 0BPM - song"));
    assert!(output_dir.join("Unknown - 0BPM - song - (Full Track).wav").exists());
}

// =============================================================================
// Estimation
// =============================================================================

#[test]
fn test_key_estimation_a_minor_triad() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let wav = root.path().join("a_minor.wav");
    generate_chord_wav(&wav, &[440.0, 523.25, 659.25], 5.0, 44100);

    let estimator = Estimator::new(Box::new(FixedTempo(100.0)), Box::new(ChromaKeyDetector::new()));
    let metadata = estimator.estimate(&wav).expect("Estimation should succeed");

    assert_eq!(metadata.key, "Am");
    assert_eq!(metadata.wheel_position, "8A");
    assert_eq!(metadata.song_name, "a_minor");
}

#[test]
fn test_estimation_is_deterministic() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let wav = root.path().join("click.wav");
    generate_click_track(&wav, 128.0, 8.0, 44100);

    let estimator = Estimator::default();
    let first = estimator.estimate_or_unknown(&wav);
    let second = estimator.estimate_or_unknown(&wav);
    assert_eq!(first, second);
}

#[test]
fn test_bpm_detection_120_click_track() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let wav = root.path().join("click_120bpm.wav");
    generate_click_track(&wav, 120.0, 10.0, 44100);

    let buffer = audio::decode(&wav).expect("Decode should succeed");
    let detected = StratumBpmDetector::new()
        .detect(&buffer)
        .expect("Tempo detection should succeed");

    assert!(
        is_bpm_match(detected.value, 120.0, 5.0),
        "120 BPM click track: detected {} BPM (expected ~120, or octave: 60/240)",
        detected.value
    );
}
