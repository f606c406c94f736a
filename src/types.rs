//! Core data types for stemsplit
//!
//! These types represent the domain model and flow through the pipeline.

use std::fmt;
use std::path::PathBuf;

// =============================================================================
// Musical primitives
// =============================================================================

/// The 12 pitch classes in Western music
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    Cs, // C#/Db
    D,
    Ds, // D#/Eb
    E,
    F,
    Fs, // F#/Gb
    G,
    Gs, // G#/Ab
    A,
    As, // A#/Bb
    B,
}

impl PitchClass {
    /// All pitch classes in index order (0 = C, ..., 11 = B)
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Convert from numeric index (0 = C, 1 = C#, ..., 11 = B), wrapping modulo 12
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    /// Convert to numeric index (0 = C, 1 = C#, ..., 11 = B)
    pub fn to_index(self) -> usize {
        self as usize
    }

    /// Sharp notation (e.g., "C", "F#", "A#")
    pub fn to_standard_notation(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        }
    }
}

/// Major or Minor scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Major,
    Minor,
}

// =============================================================================
// Analysis results
// =============================================================================

/// BPM analysis result
#[derive(Debug, Clone, PartialEq)]
pub struct BpmResult {
    /// Detected tempo before rounding
    pub value: f64,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,
}

impl BpmResult {
    /// Tempo rounded to the nearest whole BPM, halves to even
    pub fn rounded(&self) -> u32 {
        if self.value.is_finite() && self.value > 0.0 {
            self.value.round_ties_even() as u32
        } else {
            0
        }
    }
}

/// Musical key analysis result
#[derive(Debug, Clone, PartialEq)]
pub struct KeyResult {
    /// Detected tonic
    pub pitch_class: PitchClass,
    /// Major or Minor
    pub mode: Mode,
    /// Camelot notation ("1A" - "12B")
    pub camelot: String,
    /// Winning profile correlation score
    pub score: f64,
}

impl KeyResult {
    /// Key label as written in filenames ("C", "F#", "Am", "C#m")
    pub fn label(&self) -> String {
        match self.mode {
            Mode::Major => self.pitch_class.to_standard_notation().to_string(),
            Mode::Minor => format!("{}m", self.pitch_class.to_standard_notation()),
        }
    }
}

// =============================================================================
// Run records
// =============================================================================

/// Key placeholder used when estimation fails
pub const UNKNOWN_KEY: &str = "Unknown";

/// Per-run track metadata feeding every rendered filename
///
/// Computed once by the estimator and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    /// Input file name without extension
    pub song_name: String,
    /// Key label ("Am", "F#") or "Unknown"
    pub key: String,
    /// Camelot wheel position ("8A") or empty
    pub wheel_position: String,
    /// Tempo rounded to whole BPM, 0 when unknown
    pub tempo_bpm: u32,
}

impl TrackMetadata {
    /// Metadata substituted when key/tempo estimation fails
    pub fn unknown(song_name: impl Into<String>) -> Self {
        Self {
            song_name: song_name.into(),
            key: UNKNOWN_KEY.to_string(),
            wheel_position: String::new(),
            tempo_bpm: 0,
        }
    }
}

impl fmt::Display for TrackMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wheel_position.is_empty() {
            write!(f, "key {}, tempo {} BPM", self.key, self.tempo_bpm)
        } else {
            write!(
                f,
                "key {} ({}), tempo {} BPM",
                self.key, self.wheel_position, self.tempo_bpm
            )
        }
    }
}

/// One copy operation from a tool's output into the output contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemRecord {
    /// Label rendered into the `{stem}` placeholder ("Vocals", "Kick")
    pub stem_label: String,
    /// File produced by an external tool (or the original input)
    pub source_path: PathBuf,
    /// Final, already-formatted destination path
    pub dest_path: PathBuf,
}

// =============================================================================
// Audio buffer types
// =============================================================================

/// Decoded audio samples ready for analysis
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Mono samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration: f64,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        // Guard against division by zero - use 0 duration for invalid sample rate
        let duration = if sample_rate > 0 {
            samples.len() as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            samples,
            sample_rate,
            duration,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
