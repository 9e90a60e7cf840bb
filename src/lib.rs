// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Songmaker - song structure timing and metronome playback.
//!
//! A song is a list of blocks (intro, verse, chorus...), each with its own
//! tempo, meter and length. [`timing`] turns a song into an absolute timing
//! plan, [`playback`] walks that plan beat by beat with a metronome, and
//! [`ui`] shows where in the song playback is.

pub mod audio;
pub mod config;
pub mod playback;
pub mod song;
pub mod timing;
pub mod ui;

pub use playback::{BeatEvent, PlaybackObserver, PlaybackSession, PlaybackState};
pub use song::{Block, Song, SongError};
pub use timing::{TimingPlan, TimingRecord};
