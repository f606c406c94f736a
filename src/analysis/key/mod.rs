//! Key detection
//!
//! The averaged chroma vector of the harmonic signal is correlated against
//! the Krumhansl-Kessler major and minor profiles under all 12 rotations.

pub mod camelot;
pub mod chroma;

use crate::error::{Result, StemsplitError};
use crate::types::{AudioBuffer, KeyResult, Mode, PitchClass};
use std::path::PathBuf;
use tracing::debug;

/// Key detection backend
pub trait KeyDetector: Send + Sync {
    /// Detect the musical key from mono analysis samples
    fn detect(&self, buffer: &AudioBuffer) -> Result<KeyResult>;

    /// Backend name (for logging)
    fn name(&self) -> &'static str;
}

/// Krumhansl-Kessler major profile, tonic first
const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Kessler minor profile, tonic first
const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Chroma + profile correlation detector
#[derive(Debug, Default)]
pub struct ChromaKeyDetector;

impl ChromaKeyDetector {
    pub fn new() -> Self {
        Self
    }
}

impl KeyDetector for ChromaKeyDetector {
    fn detect(&self, buffer: &AudioBuffer) -> Result<KeyResult> {
        let spectrogram = chroma::magnitude_spectrogram(&buffer.samples, buffer.sample_rate);
        let harmonic = chroma::harmonic_component(&spectrogram);

        let chroma = chroma::mean_chroma(&harmonic).ok_or_else(|| StemsplitError::AnalysisError {
            path: PathBuf::new(),
            reason: "no tonal content found".to_string(),
        })?;

        let (pitch_class, mode, score) = match_profiles(&chroma);
        debug!(
            "Chroma: {:?} -> {}{} (score {:.3})",
            chroma,
            pitch_class.to_standard_notation(),
            if mode == Mode::Minor { "m" } else { "" },
            score
        );

        Ok(KeyResult {
            pitch_class,
            mode,
            camelot: camelot::to_camelot(pitch_class, mode).to_string(),
            score,
        })
    }

    fn name(&self) -> &'static str {
        "chroma-kk"
    }
}

/// Best tonic and mode for a chroma vector (index 0 = C)
///
/// Major wins only if its best score is strictly greater than the best
/// minor score.
pub fn match_profiles(chroma: &[f32; 12]) -> (PitchClass, Mode, f64) {
    let (major_tonic, major_score) = best_rotation(chroma, &MAJOR_PROFILE);
    let (minor_tonic, minor_score) = best_rotation(chroma, &MINOR_PROFILE);

    if major_score > minor_score {
        (PitchClass::from_index(major_tonic), Mode::Major, major_score)
    } else {
        (PitchClass::from_index(minor_tonic), Mode::Minor, minor_score)
    }
}

/// Highest-scoring tonic for one profile; the lowest index wins ties
fn best_rotation(chroma: &[f32; 12], profile: &[f64; 12]) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for tonic in 0..12 {
        let score = rotation_score(chroma, profile, tonic);
        if score > best.1 {
            best = (tonic, score);
        }
    }
    best
}

fn rotation_score(chroma: &[f32; 12], profile: &[f64; 12], tonic: usize) -> f64 {
    chroma
        .iter()
        .enumerate()
        .map(|(i, &energy)| energy as f64 * profile[(i + 12 - tonic) % 12])
        .sum()
}
