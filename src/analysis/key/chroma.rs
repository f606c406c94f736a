//! Chromagram of the harmonic component
//!
//! The signal goes through a Hann-windowed STFT, a median-filter
//! harmonic/percussive split keeps only the sustained (tonal) energy, and each
//! STFT bin is then folded onto its nearest pitch class.
//!
//! # Parameters
//!
//! - **N_FFT = 4096** at 22.05 kHz gives ~5.4 Hz bins, finer than a semitone
//!   above ~100 Hz.
//! - **HOP_LENGTH = 1024**: 75% overlap.
//! - **Median kernels = 17** frames (harmonic) and 17 bins (percussive).
//! - Only bins between [`MIN_FREQ`] and [`MAX_FREQ`] contribute.

use rustfft::{num_complex::Complex, FftPlanner};

/// FFT window size
pub const N_FFT: usize = 4096;

/// Hop between consecutive frames
pub const HOP_LENGTH: usize = 1024;

/// Median filter length across time (harmonic estimate)
const HARMONIC_KERNEL: usize = 17;

/// Median filter length across frequency (percussive estimate)
const PERCUSSIVE_KERNEL: usize = 17;

/// Lowest frequency folded into the chromagram (A1)
pub const MIN_FREQ: f32 = 55.0;

/// Highest frequency folded into the chromagram
pub const MAX_FREQ: f32 = 5000.0;

/// Frames whose peak power is below this are treated as silence
const SILENCE_FLOOR: f32 = 1e-10;

/// Magnitude spectrogram: `frames[t][k]`, bins truncated at [`MAX_FREQ`]
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl Spectrogram {
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn num_bins(&self) -> usize {
        self.frames.first().map_or(0, Vec::len)
    }

    /// Center frequency of bin `k` in Hz
    pub fn bin_frequency(&self, k: usize) -> f32 {
        k as f32 * self.sample_rate as f32 / N_FFT as f32
    }
}

/// Short-time magnitude spectrum of a mono signal
pub fn magnitude_spectrogram(samples: &[f32], sample_rate: u32) -> Spectrogram {
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(N_FFT);
    let window = hann_window(N_FFT);

    let max_bin = ((MAX_FREQ * N_FFT as f32 / sample_rate.max(1) as f32).ceil() as usize + 1)
        .min(N_FFT / 2 + 1);

    let num_frames = samples.len().saturating_sub(N_FFT) / HOP_LENGTH + 1;
    let mut frames = Vec::with_capacity(num_frames);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); N_FFT];

    for frame_idx in 0..num_frames {
        let start = frame_idx * HOP_LENGTH;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = samples.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * window[i], 0.0);
        }

        fft.process(&mut buffer);
        frames.push(buffer[..max_bin].iter().map(|c| c.norm()).collect());
    }

    Spectrogram {
        frames,
        sample_rate,
    }
}

/// Keep only the harmonic part of a spectrogram
///
/// Harmonic and percussive estimates are median filters across time and
/// across frequency; each bin is scaled by the soft mask `H² / (H² + P²)`.
pub fn harmonic_component(spec: &Spectrogram) -> Spectrogram {
    let num_frames = spec.num_frames();
    let num_bins = spec.num_bins();

    // Median across time, one bin at a time
    let mut harmonic = vec![vec![0.0f32; num_bins]; num_frames];
    let mut column = vec![0.0f32; num_frames];
    let mut scratch = Vec::with_capacity(HARMONIC_KERNEL);
    for k in 0..num_bins {
        for (t, value) in column.iter_mut().enumerate() {
            *value = spec.frames[t][k];
        }
        for (t, row) in harmonic.iter_mut().enumerate() {
            row[k] = windowed_median(&column, t, HARMONIC_KERNEL / 2, &mut scratch);
        }
    }

    let mut frames = Vec::with_capacity(num_frames);
    let mut scratch = Vec::with_capacity(PERCUSSIVE_KERNEL);
    for (t, frame) in spec.frames.iter().enumerate() {
        let masked = frame
            .iter()
            .enumerate()
            .map(|(k, &magnitude)| {
                let p = windowed_median(frame, k, PERCUSSIVE_KERNEL / 2, &mut scratch);
                let h = harmonic[t][k];
                let (h2, p2) = (h * h, p * p);
                if h2 + p2 > 0.0 {
                    magnitude * h2 / (h2 + p2)
                } else {
                    0.0
                }
            })
            .collect();
        frames.push(masked);
    }

    Spectrogram {
        frames,
        sample_rate: spec.sample_rate,
    }
}

/// Time-averaged 12-bin chroma vector (index 0 = C)
///
/// Every frame is normalized to a peak of 1 before averaging; silent frames
/// are skipped. Returns `None` if no frame carries tonal energy.
pub fn mean_chroma(spec: &Spectrogram) -> Option<[f32; 12]> {
    let classes: Vec<Option<usize>> = (0..spec.num_bins())
        .map(|k| pitch_class_of(spec.bin_frequency(k)))
        .collect();

    let mut sum = [0.0f32; 12];
    let mut counted = 0usize;

    for frame in &spec.frames {
        let mut chroma = [0.0f32; 12];
        for (magnitude, class) in frame.iter().zip(&classes) {
            if let Some(pc) = class {
                chroma[*pc] += magnitude * magnitude;
            }
        }

        let peak = chroma.iter().cloned().fold(0.0f32, f32::max);
        if peak < SILENCE_FLOOR {
            continue;
        }
        for (acc, value) in sum.iter_mut().zip(chroma) {
            *acc += value / peak;
        }
        counted += 1;
    }

    if counted == 0 {
        return None;
    }
    Some(sum.map(|v| v / counted as f32))
}

/// Nearest pitch class (0 = C) of a frequency, if it is inside the chroma range
pub fn pitch_class_of(freq: f32) -> Option<usize> {
    if !(MIN_FREQ..=MAX_FREQ).contains(&freq) {
        return None;
    }
    let midi = 69.0 + 12.0 * (freq / 440.0).log2();
    Some((midi.round() as i64).rem_euclid(12) as usize)
}

fn windowed_median(values: &[f32], center: usize, half: usize, scratch: &mut Vec<f32>) -> f32 {
    let start = center.saturating_sub(half);
    let end = (center + half + 1).min(values.len());
    scratch.clear();
    scratch.extend_from_slice(&values[start..end]);
    let mid = scratch.len() / 2;
    let (_, median, _) = scratch.select_nth_unstable_by(mid, f32::total_cmp);
    *median
}

fn hann_window(size: usize) -> Vec<f32> {
    use std::f32::consts::PI;
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}
