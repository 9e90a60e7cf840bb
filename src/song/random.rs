// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Random song generator.
//!
//! Produces a playable sketch: an intro, a few middle sections and an outro,
//! all sharing one key, mode, tempo and meter.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{Block, Song, SongError, FEELS, MODES, ROOT_NOTES};
use crate::timing::meter::WHITELIST;

/// Sections that may appear between the intro and the outro
const MIDDLE_PARTS: [&str; 6] = ["verse", "chorus", "bridge", "interlude", "pre-chorus", "solo"];

/// Lyric fragments; the empty entry leaves a block without lyrics
const SAMPLE_LYRICS: [&str; 7] = [
    "Lost in the night, searching for light",
    "Dreams take flight, under the sky",
    "Echoes call me, through the storm",
    "Time moves slow, in shadows deep",
    "Rise above, feel the beat",
    "Whispers fade, into the void",
    "",
];

/// Random song generator
pub struct RandomSongGenerator {
    rng: StdRng,
    /// Minimum block count, including intro and outro
    min_blocks: usize,
    /// Maximum block count, including intro and outro
    max_blocks: usize,
    /// Tempo range in BPM
    tempo_range: (u32, u32),
    /// Measure range per block
    measure_range: (u32, u32),
}

impl Default for RandomSongGenerator {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl RandomSongGenerator {
    /// Create a generator seeded from entropy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reproducible generator
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            min_blocks: 3,
            max_blocks: 6,
            tempo_range: (60, 160),
            measure_range: (4, 15),
        }
    }

    /// Generate a song
    pub fn generate(&mut self) -> Result<Song, SongError> {
        let root = *ROOT_NOTES.choose(&mut self.rng).unwrap_or(&"C");
        let mode = *MODES.choose(&mut self.rng).unwrap_or(&"Ionian");
        let meter = *WHITELIST.choose(&mut self.rng).unwrap_or(&"4/4");
        let tempo = self.rng.gen_range(self.tempo_range.0..=self.tempo_range.1);
        let count = self.rng.gen_range(self.min_blocks..=self.max_blocks);

        let mut song = Song::new(format!("Random Song {}", self.rng.gen_range(0..1000)));
        for i in 0..count {
            let kind = if i == 0 {
                "intro"
            } else if i == count - 1 {
                "outro"
            } else {
                MIDDLE_PARTS.choose(&mut self.rng).copied().unwrap_or("verse")
            };
            let measures = self.rng.gen_range(self.measure_range.0..=self.measure_range.1);
            let feel = FEELS.choose(&mut self.rng).copied().unwrap_or_default();
            let lyrics = SAMPLE_LYRICS.choose(&mut self.rng).copied().unwrap_or_default();

            let block = Block::new(kind, measures, root, mode, tempo, meter)?
                .with_feel(feel)
                .with_lyrics(lyrics);
            song.push_block(block);
        }

        debug!(song = song.name(), blocks = song.len(), tempo, meter, "generated random song");
        Ok(song)
    }
}
