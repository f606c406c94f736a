//! Key/tempo estimation for one input file
//!
//! Produces the [`TrackMetadata`] that every rendered file name is built from.
//! Estimation is best-effort: [`Estimator::estimate_or_unknown`] substitutes
//! `{"Unknown", "", 0}` on any failure.

use super::bpm::{BpmDetector, StratumBpmDetector};
use super::key::{ChromaKeyDetector, KeyDetector};
use crate::audio;
use crate::error::{Result, StemsplitError};
use crate::types::TrackMetadata;
use std::path::Path;
use tracing::{debug, warn};

/// Minimum audio duration in seconds required for a meaningful estimate
pub const MIN_AUDIO_DURATION_SECS: f64 = 3.0;

/// Key and tempo estimator with pluggable backends
pub struct Estimator {
    bpm_detector: Box<dyn BpmDetector>,
    key_detector: Box<dyn KeyDetector>,
}

impl Default for Estimator {
    fn default() -> Self {
        Self::new(
            Box::new(StratumBpmDetector::new()),
            Box::new(ChromaKeyDetector::new()),
        )
    }
}

impl Estimator {
    pub fn new(bpm_detector: Box<dyn BpmDetector>, key_detector: Box<dyn KeyDetector>) -> Self {
        Self {
            bpm_detector,
            key_detector,
        }
    }

    /// Decode `path` and estimate its key and tempo
    pub fn estimate(&self, path: &Path) -> Result<TrackMetadata> {
        debug!(
            "Estimating key/tempo for {} ({} / {})",
            path.display(),
            self.key_detector.name(),
            self.bpm_detector.name()
        );

        let buffer = audio::decode(path)?;

        if buffer.duration < MIN_AUDIO_DURATION_SECS {
            return Err(StemsplitError::AnalysisError {
                path: path.to_path_buf(),
                reason: format!(
                    "Audio too short ({:.1}s). Minimum {:.0}s required for key/tempo estimation.",
                    buffer.duration, MIN_AUDIO_DURATION_SECS
                ),
            });
        }

        let bpm = self
            .bpm_detector
            .detect(&buffer)
            .map_err(|e| attach_path(e, path))?;
        let key = self
            .key_detector
            .detect(&buffer)
            .map_err(|e| attach_path(e, path))?;

        Ok(TrackMetadata {
            song_name: song_name(path),
            key: key.label(),
            wheel_position: key.camelot,
            tempo_bpm: bpm.rounded(),
        })
    }

    /// Estimate, falling back to unknown metadata on any error
    pub fn estimate_or_unknown(&self, path: &Path) -> TrackMetadata {
        match self.estimate(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Key/tempo estimation failed, continuing without it: {}", e);
                TrackMetadata::unknown(song_name(path))
            }
        }
    }
}

/// Input file name without its extension
pub fn song_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn attach_path(err: StemsplitError, path: &Path) -> StemsplitError {
    match err {
        StemsplitError::AnalysisError { reason, .. } => StemsplitError::AnalysisError {
            path: path.to_path_buf(),
            reason,
        },
        other => other,
    }
}
