// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Reconciles the frame clock and the audio hardware clock.
//!
//! One reference pair is recorded when playback begins. Every later instant
//! on either clock is derived from that pair plus an offset computed from
//! the timing plan; nothing is ever added to a running "now".

/// Reference instants on both clocks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSync {
    /// Frame-clock seconds at song position zero
    wall_start: f64,
    /// Audio-clock seconds at song position zero
    audio_start: f64,
}

impl ClockSync {
    /// Record a reference pair
    pub fn new(wall_start: f64, audio_start: f64) -> Self {
        Self { wall_start, audio_start }
    }

    /// Frame-clock reference instant
    pub fn wall_start(&self) -> f64 {
        self.wall_start
    }

    /// Audio-clock reference instant
    pub fn audio_start(&self) -> f64 {
        self.audio_start
    }

    /// Frame-clock instant `offset` seconds after the reference
    pub fn wall_at(&self, offset: f64) -> f64 {
        self.wall_start + offset
    }

    /// Audio-clock instant `offset` seconds after the reference
    pub fn audio_at(&self, offset: f64) -> f64 {
        self.audio_start + offset
    }

    /// Audio-clock instant of a beat inside a section starting at `section_offset`
    pub fn audio_beat(&self, section_offset: f64, beat: u64, beat_duration: f64) -> f64 {
        self.audio_start + section_offset + beat as f64 * beat_duration
    }
}
