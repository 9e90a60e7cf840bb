// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Metronome audio.
//!
//! This module provides:
//! - WAV sample decoding for the strong and weak clicks
//! - A frame-accurate cue mixer that keeps its own audio clock
//! - Audio output via cpal, plus a silent sink for muted playback

pub mod mixer;
pub mod output;
pub mod sample;

pub use mixer::CueMixer;
pub use output::{AudioConfig, CpalCueSink};
pub use sample::Sample;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

/// Audio error types
#[derive(Debug, Error)]
pub enum AudioError {
    /// Sample file could not be read or decoded
    #[error("Failed to decode {path:?}: {source}")]
    Decode {
        /// Sample path
        path: PathBuf,
        /// Decoder error
        #[source]
        source: hound::Error,
    },
    /// Sample format the decoder cannot convert
    #[error("Unsupported sample format: {0}")]
    Unsupported(String),
    /// No audio device available
    #[error("No audio device available")]
    NoDevice,
    /// Failed to initialize audio
    #[error("Audio initialization failed: {0}")]
    InitFailed(String),
    /// Failed to start audio stream
    #[error("Audio stream failed: {0}")]
    StreamFailed(String),
}

/// Which click a beat uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CueKind {
    /// First beat of a measure
    Strong,
    /// Every other beat
    Weak,
}

impl CueKind {
    /// Strong on the first beat of a measure, weak otherwise
    pub fn for_beat(is_first_beat_of_measure: bool) -> Self {
        if is_first_beat_of_measure {
            CueKind::Strong
        } else {
            CueKind::Weak
        }
    }
}

/// Handle to a scheduled cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CueHandle(pub u64);

impl CueHandle {
    /// Handle that refers to no cue
    pub const NONE: CueHandle = CueHandle(u64::MAX);
}

/// Destination for scheduled samples.
///
/// Instants are seconds on the sink's own clock, which runs independently
/// of the frame clock.
pub trait CueSink {
    /// Current time on the audio clock
    fn now(&self) -> f64;

    /// Play `sample` at audio-clock instant `at`
    fn schedule(&mut self, sample: &Sample, at: f64) -> CueHandle;

    /// Cancel one cue; unknown or finished handles are ignored
    fn cancel(&mut self, handle: CueHandle);

    /// Cancel every pending and sounding cue
    fn cancel_all(&mut self);
}

impl<S: CueSink + ?Sized> CueSink for &mut S {
    fn now(&self) -> f64 {
        (**self).now()
    }

    fn schedule(&mut self, sample: &Sample, at: f64) -> CueHandle {
        (**self).schedule(sample, at)
    }

    fn cancel(&mut self, handle: CueHandle) {
        (**self).cancel(handle);
    }

    fn cancel_all(&mut self) {
        (**self).cancel_all();
    }
}

/// A cue recorded by [`NullCueSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCue {
    /// Handle returned for the cue
    pub handle: CueHandle,
    /// Sample label
    pub sample: String,
    /// Audio-clock instant
    pub at: f64,
    /// Whether the cue was cancelled
    pub cancelled: bool,
}

/// Silent sink with a manually advanced clock.
///
/// Used when sound is disabled. A sink made with [`NullCueSink::recording`]
/// also keeps every cue so playback can be inspected without an audio
/// device; the plain one only hands out handles.
#[derive(Debug, Clone, Default)]
pub struct NullCueSink {
    now: f64,
    record: bool,
    next_handle: u64,
    cues: Vec<RecordedCue>,
}

impl NullCueSink {
    /// Create a sink with its clock at zero that keeps nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that records every cue
    pub fn recording() -> Self {
        Self {
            record: true,
            ..Self::default()
        }
    }

    /// Set the audio clock
    pub fn set_now(&mut self, now: f64) {
        self.now = now;
    }

    /// Advance the audio clock
    pub fn advance(&mut self, seconds: f64) {
        self.now += seconds;
    }

    /// Every cue scheduled so far; empty unless recording
    pub fn cues(&self) -> &[RecordedCue] {
        &self.cues
    }

    /// Cues that have not been cancelled
    pub fn live_cues(&self) -> impl Iterator<Item = &RecordedCue> {
        self.cues.iter().filter(|cue| !cue.cancelled)
    }
}

impl CueSink for NullCueSink {
    fn now(&self) -> f64 {
        self.now
    }

    fn schedule(&mut self, sample: &Sample, at: f64) -> CueHandle {
        let handle = CueHandle(self.next_handle);
        self.next_handle += 1;
        if self.record {
            self.cues.push(RecordedCue {
                handle,
                sample: sample.name().to_string(),
                at,
                cancelled: false,
            });
        }
        handle
    }

    fn cancel(&mut self, handle: CueHandle) {
        // Handles are issued in order, so a recorded cue sits at its id
        if let Some(cue) = self.cues.get_mut(handle.0 as usize) {
            cue.cancelled = true;
        }
    }

    fn cancel_all(&mut self) {
        for cue in self.cues.iter_mut() {
            cue.cancelled = true;
        }
    }
}

/// Strong and weak clicks with optional short variants
#[derive(Debug, Clone, Default)]
pub struct SampleBank {
    strong: Option<Sample>,
    weak: Option<Sample>,
    strong_short: Option<Sample>,
    weak_short: Option<Sample>,
}

impl SampleBank {
    /// File names looked up by [`SampleBank::load`]
    pub const FILES: [&'static str; 4] = ["tock.wav", "tick.wav", "tock_short.wav", "tick_short.wav"];

    /// Bank with no samples; every cue is skipped
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bank from already decoded samples
    pub fn new(strong: Option<Sample>, weak: Option<Sample>) -> Self {
        Self {
            strong,
            weak,
            ..Self::default()
        }
    }

    /// Builder: set the short variants
    pub fn with_short(mut self, strong_short: Option<Sample>, weak_short: Option<Sample>) -> Self {
        self.strong_short = strong_short;
        self.weak_short = weak_short;
        self
    }

    /// Load the clicks from a directory.
    ///
    /// Missing or undecodable files leave their slot empty; playback then
    /// skips those cues.
    pub fn load(dir: &Path, sample_rate: u32) -> Self {
        let load = |name: &str| {
            let path = dir.join(name);
            match Sample::load_wav(&path, sample_rate) {
                Ok(sample) => {
                    debug!(path = ?path, frames = sample.len(), "sample loaded");
                    Some(sample)
                }
                Err(e) => {
                    warn!(error = %e, "sample unavailable");
                    None
                }
            }
        };

        Self {
            strong: load(Self::FILES[0]),
            weak: load(Self::FILES[1]),
            strong_short: load(Self::FILES[2]),
            weak_short: load(Self::FILES[3]),
        }
    }

    /// Pick the sample for a cue.
    ///
    /// At or above `short_threshold` BPM the short variant is used when it
    /// exists.
    pub fn select(&self, kind: CueKind, tempo: u32, short_threshold: u32) -> Option<&Sample> {
        let (regular, short) = match kind {
            CueKind::Strong => (&self.strong, &self.strong_short),
            CueKind::Weak => (&self.weak, &self.weak_short),
        };
        if tempo >= short_threshold {
            short.as_ref().or(regular.as_ref())
        } else {
            regular.as_ref()
        }
    }

    /// Check if no sample is available
    pub fn is_empty(&self) -> bool {
        self.strong.is_none()
            && self.weak.is_none()
            && self.strong_short.is_none()
            && self.weak_short.is_none()
    }
}
