//! Tempo detection
//!
//! Tempo comes from stratum-dsp's beat tracker. The estimator only keeps the
//! rounded value, but the raw tempo and confidence are logged.

use crate::error::{Result, StemsplitError};
use crate::types::{AudioBuffer, BpmResult};
use std::path::PathBuf;
use stratum_dsp::{analyze_audio, AnalysisConfig};
use tracing::debug;

/// Tempo detection backend
pub trait BpmDetector: Send + Sync {
    /// Detect tempo from mono analysis samples
    fn detect(&self, buffer: &AudioBuffer) -> Result<BpmResult>;

    /// Backend name (for logging)
    fn name(&self) -> &'static str;
}

/// BPM detector using stratum-dsp
#[derive(Debug, Default)]
pub struct StratumBpmDetector;

impl StratumBpmDetector {
    pub fn new() -> Self {
        Self
    }
}

impl BpmDetector for StratumBpmDetector {
    fn detect(&self, buffer: &AudioBuffer) -> Result<BpmResult> {
        debug!(
            "Analyzing tempo with stratum-dsp ({} samples, {}Hz)",
            buffer.len(),
            buffer.sample_rate
        );

        let result = analyze_audio(&buffer.samples, buffer.sample_rate, AnalysisConfig::default())
            .map_err(|e| StemsplitError::AnalysisError {
                path: PathBuf::new(),
                reason: format!("BPM analysis failed: {}", e),
            })?;

        let value = result.bpm as f64;
        if !value.is_finite() || value <= 0.0 {
            return Err(StemsplitError::AnalysisError {
                path: PathBuf::new(),
                reason: format!("beat tracker returned an invalid tempo ({})", value),
            });
        }

        let confidence = result.bpm_confidence as f64;
        debug!("Detected tempo: {:.2} BPM (confidence: {:.2})", value, confidence);

        Ok(BpmResult { value, confidence })
    }

    fn name(&self) -> &'static str {
        "stratum-dsp"
    }
}
