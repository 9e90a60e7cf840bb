// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Song playback.
//!
//! A [`PlaybackSession`] walks a timing plan: an optional one-measure count
//! in, then each block in order, emitting beat events to an observer and
//! queueing metronome clicks on a [`CueSink`](crate::audio::CueSink).

pub mod runner;
pub mod session;

pub use runner::{play_and_run, run_session, RunOutcome};
pub use session::{PlaybackSession, SessionOptions};

use crate::config::PlayerConfig;

/// Snapshot of the active playback position
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackState {
    /// Whether a session is running
    pub is_playing: bool,
    /// Whether the count in is sounding
    pub in_lead_in: bool,
    /// Block being played
    pub current_block_index: usize,
    /// Beat within the current block, from 0
    pub beat_within_block: u64,
    /// Measure within the current block, from 1 once a beat has played
    pub measure_within_block: u64,
    /// Seconds since the first block started
    pub elapsed_song_seconds: f64,
    /// Beats since the first block started
    pub elapsed_song_beats: u64,
}

impl PlaybackState {
    /// Return to idle
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Move the position to a beat
    pub fn apply(&mut self, event: &BeatEvent) {
        self.is_playing = true;
        self.in_lead_in = event.is_lead_in();
        if let Some(index) = event.block_index {
            self.current_block_index = index;
        }
        self.beat_within_block = event.beat_index;
        self.measure_within_block = event.measure_index;
        self.elapsed_song_beats = event.song_beat;
        self.elapsed_song_seconds = event.song_time;
    }
}

/// One beat as reported to observers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    /// Block the beat belongs to; `None` during the count in
    pub block_index: Option<usize>,
    /// Seconds since the current clock's start
    pub elapsed_time: f64,
    /// Beat within the block (or count in), from 0
    pub beat_index: u64,
    /// Measure within the block (or count in), from 1
    pub measure_index: u64,
    /// First beat of a measure
    pub is_first_beat_of_measure: bool,
    /// Beats since the first block started
    pub song_beat: u64,
    /// Seconds since the first block started
    pub song_time: f64,
}

impl BeatEvent {
    /// Check if this beat belongs to the count in
    pub fn is_lead_in(&self) -> bool {
        self.block_index.is_none()
    }
}

/// Receives playback notifications.
///
/// All methods default to doing nothing.
pub trait PlaybackObserver {
    /// A beat was emitted
    fn on_beat(&mut self, _event: &BeatEvent) {}

    /// A block began
    fn on_block_change(&mut self, _block_index: usize) {}

    /// Called once per poll while a block plays, with the song position
    /// on the frame clock. Unlike beat times this advances between beats.
    fn on_frame(&mut self, _song_time: f64) {}

    /// The last block finished. Not called when playback is stopped.
    fn on_playback_end(&mut self) {}

    /// Playback was stopped before the end
    fn on_stop(&mut self) {}
}

impl PlaybackObserver for () {}

impl<O: PlaybackObserver + ?Sized> PlaybackObserver for &mut O {
    fn on_beat(&mut self, event: &BeatEvent) {
        (**self).on_beat(event);
    }

    fn on_block_change(&mut self, block_index: usize) {
        (**self).on_block_change(block_index);
    }

    fn on_frame(&mut self, song_time: f64) {
        (**self).on_frame(song_time);
    }

    fn on_playback_end(&mut self) {
        (**self).on_playback_end();
    }

    fn on_stop(&mut self) {
        (**self).on_stop();
    }
}

impl From<&PlayerConfig> for SessionOptions {
    fn from(config: &PlayerConfig) -> Self {
        SessionOptions {
            lead_in: config.lead_in,
            start_delay: config.start_delay().as_secs_f64(),
            short_sample_tempo: config.short_sample_tempo,
        }
    }
}
