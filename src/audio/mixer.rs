// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Frame-accurate cue mixer.
//!
//! Cues wait in a priority queue keyed by start frame and move to the active
//! list when the render position reaches them. The render position is the
//! audio clock: it only advances as frames are rendered.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::trace;

use super::{CueHandle, CueSink, Sample};

/// A cue waiting for its start frame
#[derive(Debug, Clone)]
struct PendingCue {
    /// Frame at which the sample starts
    start_frame: u64,
    /// Handle returned to the caller
    handle: CueHandle,
    /// Sample to play
    sample: Sample,
}

// For BinaryHeap - we want the earliest start frame first
impl Eq for PendingCue {}

impl PartialEq for PendingCue {
    fn eq(&self, other: &Self) -> bool {
        self.start_frame == other.start_frame && self.handle == other.handle
    }
}

impl Ord for PendingCue {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .start_frame
            .cmp(&self.start_frame)
            .then_with(|| other.handle.cmp(&self.handle))
    }
}

impl PartialOrd for PendingCue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A cue that is currently sounding
#[derive(Debug, Clone)]
struct ActiveCue {
    handle: CueHandle,
    sample: Sample,
    /// Next frame of the sample to play
    position: usize,
}

/// Software mixer for scheduled cues
#[derive(Debug)]
pub struct CueMixer {
    /// Output sample rate
    sample_rate: u32,
    /// Frames rendered so far
    frame: u64,
    /// Cues not yet started
    pending: BinaryHeap<PendingCue>,
    /// Cues currently sounding
    active: Vec<ActiveCue>,
    /// Next handle id
    next_handle: u64,
    /// Output gain (0.0 - 1.0)
    gain: f32,
}

impl CueMixer {
    /// Create a mixer at a sample rate
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            frame: 0,
            pending: BinaryHeap::with_capacity(256),
            active: Vec::with_capacity(8),
            next_handle: 0,
            gain: 1.0,
        }
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rendered so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Set output gain (0.0 - 1.0)
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    /// Get output gain
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Cues waiting to start
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Cues currently sounding
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Check if nothing is queued or sounding
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.active.is_empty()
    }

    /// Frame index for an audio-clock instant
    pub fn frame_at(&self, at: f64) -> u64 {
        (at.max(0.0) * self.sample_rate as f64).round() as u64
    }

    /// Mix into an interleaved buffer, advancing the audio clock.
    ///
    /// Every channel of a frame receives the same mono mix.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            while self
                .pending
                .peek()
                .is_some_and(|cue| cue.start_frame <= self.frame)
            {
                if let Some(cue) = self.pending.pop() {
                    self.active.push(ActiveCue {
                        handle: cue.handle,
                        sample: cue.sample,
                        position: 0,
                    });
                }
            }

            let mut mix = 0.0;
            for cue in self.active.iter_mut() {
                if let Some(value) = cue.sample.frames().get(cue.position) {
                    mix += *value;
                }
                cue.position += 1;
            }
            self.active.retain(|cue| cue.position < cue.sample.len());

            let value = (mix * self.gain).clamp(-1.0, 1.0);
            for sample in frame.iter_mut() {
                *sample = value;
            }
            self.frame += 1;
        }
    }
}

impl CueSink for CueMixer {
    fn now(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    fn schedule(&mut self, sample: &Sample, at: f64) -> CueHandle {
        let handle = CueHandle(self.next_handle);
        self.next_handle += 1;

        let start_frame = self.frame_at(at).max(self.frame);
        trace!(sample = sample.name(), start_frame, "cue scheduled");
        self.pending.push(PendingCue {
            start_frame,
            handle,
            sample: sample.clone(),
        });
        handle
    }

    fn cancel(&mut self, handle: CueHandle) {
        self.pending.retain(|cue| cue.handle != handle);
        self.active.retain(|cue| cue.handle != handle);
    }

    fn cancel_all(&mut self) {
        self.pending.clear();
        self.active.clear();
    }
}
