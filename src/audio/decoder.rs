//! Audio decoding using symphonia
//!
//! The estimator only needs a mono signal at a modest rate, so every input is
//! downmixed and resampled to [`ANALYSIS_SAMPLE_RATE`] with rubato.

use crate::error::{Result, StemsplitError};
use crate::types::AudioBuffer;
use rubato::{FftFixedInOut, Resampler};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// Analysis sample rate (22050 Hz)
///
/// Key and tempo content sits well below 11 kHz.
pub const ANALYSIS_SAMPLE_RATE: u32 = 22050;

/// Largest input we attempt to decode (2 GB)
const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Resampler chunk size in frames
const RESAMPLE_CHUNK: usize = 1024;

/// An opened audio track ready for packet decoding
struct OpenTrack {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
}

/// Decode an audio file to a mono buffer at [`ANALYSIS_SAMPLE_RATE`]
pub fn decode(path: &Path) -> Result<AudioBuffer> {
    let mut track = open_track(path)?;

    debug!(
        "Decoding {} @ {}Hz, {} channels",
        path.display(),
        track.sample_rate,
        track.channels
    );

    let mono = read_mono(path, &mut track)?;
    let samples = resample(&mono, track.sample_rate, ANALYSIS_SAMPLE_RATE);

    debug!(
        "Decoded {} samples ({:.2}s)",
        samples.len(),
        samples.len() as f64 / ANALYSIS_SAMPLE_RATE as f64
    );

    Ok(AudioBuffer::new(samples, ANALYSIS_SAMPLE_RATE))
}

fn open_track(path: &Path) -> Result<OpenTrack> {
    let size = std::fs::metadata(path)
        .map_err(|e| StemsplitError::decode_error(path, format!("Failed to read file metadata: {}", e)))?
        .len();
    if size > MAX_FILE_SIZE {
        return Err(StemsplitError::decode_error(
            path,
            format!(
                "File too large ({:.1} GB). Maximum supported size is 2 GB.",
                size as f64 / (1024.0 * 1024.0 * 1024.0)
            ),
        ));
    }

    let file = std::fs::File::open(path)
        .map_err(|e| StemsplitError::decode_error(path, format!("Failed to open file: {}", e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| StemsplitError::decode_error(path, format!("Failed to probe format: {}", e)))?;
    let format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| StemsplitError::decode_error(path, "No audio tracks found"))?;

    let codec_params = track.codec_params.clone();
    let track_id = track.id;

    let decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| StemsplitError::decode_error(path, format!("Failed to create decoder: {}", e)))?;

    Ok(OpenTrack {
        format,
        decoder,
        track_id,
        sample_rate: codec_params.sample_rate.unwrap_or(44100),
        channels: codec_params.channels.map(|c| c.count()).unwrap_or(2),
    })
}

/// Read every packet of the track, averaging channels into one signal
fn read_mono(path: &Path, track: &mut OpenTrack) -> Result<Vec<f32>> {
    let mut mono = Vec::new();

    loop {
        let packet = match track.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                return Err(StemsplitError::decode_error(path, format!("Failed to read packet: {}", e)));
            }
        };

        if packet.track_id() != track.track_id {
            continue;
        }

        let decoded = match track.decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                trace!("Skipping corrupted frame: {}", e);
                continue;
            }
            Err(e) => {
                return Err(StemsplitError::decode_error(path, format!("Decode error: {}", e)));
            }
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        mono.extend(to_mono(sample_buf.samples(), spec.channels.count()));
    }

    Ok(mono)
}

/// Average interleaved frames into a single channel
fn to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// FFT-based resampling with rubato, trimming the zero-padded tail
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let mut resampler =
        match FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, RESAMPLE_CHUNK, 1) {
            Ok(r) => r,
            Err(e) => {
                debug!("Rubato initialization failed ({}), using linear interpolation", e);
                return resample_linear(samples, from_rate, to_rate);
            }
        };

    let frames_in = resampler.input_frames_next();
    let ratio = to_rate as f64 / from_rate as f64;
    let expected_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(expected_len + resampler.output_frames_next());

    for chunk in samples.chunks(frames_in) {
        let mut block = chunk.to_vec();
        block.resize(frames_in, 0.0);

        match resampler.process(&[block], None) {
            Ok(mut channels) => {
                if let Some(channel) = channels.pop() {
                    output.extend(channel);
                }
            }
            Err(e) => {
                debug!("Rubato processing error ({}), using linear interpolation", e);
                return resample_linear(samples, from_rate, to_rate);
            }
        }
    }

    output.truncate(expected_len);
    output
}

/// Linear interpolation, used only when rubato cannot be set up
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == to_rate {
        return samples.to_vec();
    }

    let step = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / step) as usize;
    let last = samples.len() - 1;

    (0..output_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            if idx < last {
                samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
            } else {
                samples[last]
            }
        })
        .collect()
}
