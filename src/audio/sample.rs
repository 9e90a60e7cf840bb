// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Decoded click samples.
//!
//! Samples are stored as mono `f32` frames at the output sample rate so the
//! mixer can copy them straight into the output buffer.

use std::path::Path;
use std::sync::Arc;

use super::AudioError;

/// A decoded mono sample
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Label used in logs (file stem for loaded samples)
    name: String,
    /// Mono frames
    frames: Arc<[f32]>,
    /// Frames per second
    sample_rate: u32,
}

impl Sample {
    /// Create a sample from mono frames
    pub fn from_frames(name: impl Into<String>, frames: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            name: name.into(),
            frames: frames.into(),
            sample_rate: sample_rate.max(1),
        }
    }

    /// Decode a WAV file, downmix to mono and resample to `target_rate`
    pub fn load_wav(path: &Path, target_rate: u32) -> Result<Self, AudioError> {
        let decode_error = |source| AudioError::Decode {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = hound::WavReader::open(path).map_err(decode_error)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(decode_error)?,
            hound::SampleFormat::Int => {
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(AudioError::Unsupported(format!(
                        "{} bits per sample in {:?}",
                        spec.bits_per_sample, path
                    )));
                }
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(decode_error)?
            }
        };

        let frames = downmix(&samples, spec.channels.max(1) as usize);
        let frames = resample_linear(&frames, spec.sample_rate, target_rate);
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::from_frames(name, frames, target_rate))
    }

    /// Get the sample label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the mono frames
    pub fn frames(&self) -> &[f32] {
        &self.frames
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check for a sample with no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.sample_rate as f64
    }
}

/// Average interleaved channels into mono frames
fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear interpolation resampler
fn resample_linear(frames: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || source_rate == 0 || target_rate == 0 || frames.is_empty() {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let last = frames.len() - 1;

    (0..out_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = src_pos.floor() as usize;
            if idx >= last {
                frames[last]
            } else {
                let frac = (src_pos - idx as f64) as f32;
                frames[idx] * (1.0 - frac) + frames[idx + 1] * frac
            }
        })
        .collect()
}
