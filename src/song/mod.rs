// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Song structure.
//!
//! A song is an ordered list of validated blocks. Blocks are checked when
//! they are constructed, so an invalid block can never enter a song, and
//! every edit leaves the song untouched when it fails.

pub mod file;
pub mod random;
pub mod watcher;

pub use file::SongFile;
pub use random::RandomSongGenerator;
pub use watcher::{SongEvent, SongWatcher};

use std::path::PathBuf;

use thiserror::Error;

use crate::timing::meter::{self, TimeSignature};
use crate::timing::TimingPlan;

/// Suggested block types. The set is open; any non-empty label is valid.
pub const PART_TYPES: [&str; 9] = [
    "intro",
    "verse",
    "chorus",
    "bridge",
    "outro",
    "interlude",
    "pre-chorus",
    "solo",
    "breakdown",
];

/// Suggested root notes
pub const ROOT_NOTES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Suggested modes
pub const MODES: [&str; 7] = [
    "Ionian",
    "Dorian",
    "Phrygian",
    "Lydian",
    "Mixolydian",
    "Aeolian",
    "Locrian",
];

/// Suggested feels
pub const FEELS: [&str; 16] = [
    "Happiness",
    "Sadness",
    "Tension",
    "Euphoria",
    "Calmness",
    "Anger",
    "Mystical",
    "Rebellion",
    "Triumph",
    "Bliss",
    "Frustration",
    "Atmospheric",
    "Trippy",
    "Awakening",
    "Intense",
    "Climactic",
];

/// Song errors
#[derive(Debug, Error)]
pub enum SongError {
    /// A block field failed validation
    #[error("{}", validation_message(.position, .field, .reason))]
    Validation {
        /// 1-based block position, when known
        position: Option<usize>,
        /// Offending field name as it appears in song files
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
    /// Time signature not in the whitelist
    #[error("{}", meter_message(.position, .label))]
    UnsupportedMeter {
        /// 1-based block position, when known
        position: Option<usize>,
        /// The rejected label
        label: String,
    },
    /// Song file is missing its name or block list
    #[error("Invalid song file format: {0}")]
    InvalidFormat(String),
    /// Song file is not valid JSON
    #[error("Failed to parse song file: {0}")]
    Json(#[from] serde_json::Error),
    /// Song file could not be read or written
    #[error("Failed to access song file {path:?}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Edit addressed a block that does not exist
    #[error("Block index {index} out of range for {len} blocks")]
    BlockIndex {
        /// Requested index
        index: usize,
        /// Number of blocks
        len: usize,
    },
}

fn validation_message(position: &Option<usize>, field: &str, reason: &str) -> String {
    match position {
        Some(position) => format!("Block {}: {} {}", position, field, reason),
        None => format!("Invalid block: {} {}", field, reason),
    }
}

fn meter_message(position: &Option<usize>, label: &str) -> String {
    let reason = format!("{} is not a supported time signature", label);
    validation_message(position, "timeSignature", &reason)
}

impl SongError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SongError::Validation {
            position: None,
            field,
            reason: reason.into(),
        }
    }

    /// Attach a 1-based block position to a validation error
    pub fn at_position(self, position: usize) -> Self {
        match self {
            SongError::Validation { field, reason, .. } => SongError::Validation {
                position: Some(position),
                field,
                reason,
            },
            SongError::UnsupportedMeter { label, .. } => SongError::UnsupportedMeter {
                position: Some(position),
                label,
            },
            other => other,
        }
    }

    /// Field named by a validation error
    pub fn field(&self) -> Option<&'static str> {
        match self {
            SongError::Validation { field, .. } => Some(field),
            SongError::UnsupportedMeter { .. } => Some("timeSignature"),
            _ => None,
        }
    }

    /// Block position named by a validation error
    pub fn position(&self) -> Option<usize> {
        match self {
            SongError::Validation { position, .. } => *position,
            SongError::UnsupportedMeter { position, .. } => *position,
            _ => None,
        }
    }
}

fn require_text(field: &'static str, value: &str) -> Result<String, SongError> {
    if value.trim().is_empty() {
        Err(SongError::invalid(field, "is missing or empty"))
    } else {
        Ok(value.to_string())
    }
}

fn require_positive(field: &'static str, value: u32) -> Result<u32, SongError> {
    if value == 0 {
        Err(SongError::invalid(field, "must be a positive number"))
    } else {
        Ok(value)
    }
}

/// One song section
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Section category (open set, see [`PART_TYPES`])
    kind: String,
    /// Measures in the section
    measures: u32,
    /// Root note
    root_note: String,
    /// Mode
    mode: String,
    /// Tempo in BPM
    tempo: u32,
    /// Time signature
    time_signature: TimeSignature,
    /// Mood label
    feel: String,
    /// Lyrics
    lyrics: String,
}

impl Block {
    /// Create a validated block.
    ///
    /// Fields are checked in song-file order and the first failure is
    /// reported.
    pub fn new(
        kind: impl Into<String>,
        measures: u32,
        root_note: impl Into<String>,
        mode: impl Into<String>,
        tempo: u32,
        time_signature: &str,
    ) -> Result<Self, SongError> {
        let kind = require_text("type", &kind.into())?;
        let measures = require_positive("measures", measures)?;
        let root_note = require_text("rootNote", &root_note.into())?;
        let mode = require_text("mode", &mode.into())?;
        let tempo = require_positive("tempo", tempo)?;
        require_text("timeSignature", time_signature)?;
        let time_signature = check_time_signature(time_signature)?;

        Ok(Self {
            kind,
            measures,
            root_note,
            mode,
            tempo,
            time_signature,
            feel: String::new(),
            lyrics: String::new(),
        })
    }

    /// Get the section type
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Get measures
    pub fn measures(&self) -> u32 {
        self.measures
    }

    /// Get root note
    pub fn root_note(&self) -> &str {
        &self.root_note
    }

    /// Get mode
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Get tempo
    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    /// Get time signature
    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    /// Pulses per measure
    pub fn beats_per_measure(&self) -> u32 {
        self.time_signature.beats_per_measure()
    }

    /// Get feel
    pub fn feel(&self) -> &str {
        &self.feel
    }

    /// Set feel
    pub fn set_feel(&mut self, feel: impl Into<String>) {
        self.feel = feel.into();
    }

    /// Get lyrics
    pub fn lyrics(&self) -> &str {
        &self.lyrics
    }

    /// Set lyrics
    pub fn set_lyrics(&mut self, lyrics: impl Into<String>) {
        self.lyrics = lyrics.into();
    }

    /// Builder: set feel
    pub fn with_feel(mut self, feel: impl Into<String>) -> Self {
        self.feel = feel.into();
        self
    }

    /// Builder: set lyrics
    pub fn with_lyrics(mut self, lyrics: impl Into<String>) -> Self {
        self.lyrics = lyrics.into();
        self
    }
}

/// A named, ordered sequence of blocks
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    /// Song name
    name: String,
    /// Blocks in playback order
    blocks: Vec<Block>,
}

impl Default for Song {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl Song {
    /// Create an empty song
    pub fn new(name: impl Into<String>) -> Self {
        let mut song = Self {
            name: String::new(),
            blocks: Vec::new(),
        };
        song.rename(name);
        song
    }

    /// Get song name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set song name; an empty name becomes "Untitled"
    pub fn rename(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.name = if name.trim().is_empty() {
            "Untitled".to_string()
        } else {
            name
        };
    }

    /// Get all blocks
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Get block at index
    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Check for an empty song
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Append a block
    pub fn push_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Insert a block at `index` (may equal the block count)
    pub fn insert_block(&mut self, index: usize, block: Block) -> Result<(), SongError> {
        if index > self.blocks.len() {
            return Err(self.index_error(index));
        }
        self.blocks.insert(index, block);
        Ok(())
    }

    /// Remove and return the block at `index`
    pub fn remove_block(&mut self, index: usize) -> Result<Block, SongError> {
        if index >= self.blocks.len() {
            return Err(self.index_error(index));
        }
        Ok(self.blocks.remove(index))
    }

    /// Move the block at `from` so it ends up at position `to`
    pub fn move_block(&mut self, from: usize, to: usize) -> Result<(), SongError> {
        let len = self.blocks.len();
        if from >= len {
            return Err(self.index_error(from));
        }
        if to >= len {
            return Err(self.index_error(to));
        }
        let block = self.blocks.remove(from);
        self.blocks.insert(to, block);
        Ok(())
    }

    /// Replace the block at `index`, returning the previous one
    pub fn update_block(&mut self, index: usize, block: Block) -> Result<Block, SongError> {
        match self.blocks.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, block)),
            None => Err(self.index_error(index)),
        }
    }

    /// Remove every block
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Total measures across all blocks
    pub fn total_measures(&self) -> u64 {
        self.blocks.iter().map(|b| b.measures() as u64).sum()
    }

    /// Compute the timing plan for the current block order
    pub fn timing_plan(&self) -> TimingPlan {
        TimingPlan::build(&self.blocks)
    }

    /// Replace this song with one parsed from JSON.
    ///
    /// The song is only modified when every block validates.
    pub fn import_json(&mut self, json: &str) -> Result<(), SongError> {
        *self = Song::from_json(json)?;
        Ok(())
    }

    /// Builder: add block
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    fn index_error(&self, index: usize) -> SongError {
        SongError::BlockIndex {
            index,
            len: self.blocks.len(),
        }
    }
}

/// Check a time signature label for use in a block
pub fn check_time_signature(label: &str) -> Result<TimeSignature, SongError> {
    label
        .parse::<TimeSignature>()
        .map_err(|_| SongError::UnsupportedMeter {
            position: None,
            label: label.to_string(),
        })
}

/// Whether a time signature label is accepted
pub fn is_valid_time_signature(label: &str) -> bool {
    meter::is_supported(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verse(measures: u32) -> Block {
        Block::new("verse", measures, "C", "Ionian", 120, "4/4").unwrap()
    }

    #[test]
    fn test_block_creation() {
        let block = Block::new("chorus", 8, "G", "Mixolydian", 120, "4/4")
            .unwrap()
            .with_feel("Euphoria")
            .with_lyrics("Joyful echoes rise");
        assert_eq!(block.kind(), "chorus");
        assert_eq!(block.measures(), 8);
        assert_eq!(block.beats_per_measure(), 4);
        assert_eq!(block.feel(), "Euphoria");
        assert_eq!(block.lyrics(), "Joyful echoes rise");
    }

    #[test]
    fn test_open_block_types() {
        assert!(Block::new("drum-break", 2, "E", "Aeolian", 90, "7/8").is_ok());
    }

    #[test]
    fn test_block_validation_names_field() {
        let err = Block::new("", 4, "C", "Ionian", 120, "4/4").unwrap_err();
        assert_eq!(err.field(), Some("type"));

        let err = Block::new("verse", 0, "C", "Ionian", 120, "4/4").unwrap_err();
        assert_eq!(err.field(), Some("measures"));

        let err = Block::new("verse", 4, " ", "Ionian", 120, "4/4").unwrap_err();
        assert_eq!(err.field(), Some("rootNote"));

        let err = Block::new("verse", 4, "C", "", 120, "4/4").unwrap_err();
        assert_eq!(err.field(), Some("mode"));

        let err = Block::new("verse", 4, "C", "Ionian", 0, "4/4").unwrap_err();
        assert_eq!(err.field(), Some("tempo"));
        assert_eq!(err.to_string(), "Invalid block: tempo must be a positive number");

        let err = Block::new("verse", 4, "C", "Ionian", 120, "").unwrap_err();
        assert_eq!(err.field(), Some("timeSignature"));
    }

    #[test]
    fn test_unsupported_meter() {
        let err = Block::new("verse", 4, "C", "Ionian", 120, "5/8").unwrap_err();
        assert!(matches!(err, SongError::UnsupportedMeter { ref label, .. } if label == "5/8"));
        assert_eq!(err.field(), Some("timeSignature"));
        assert_eq!(
            err.at_position(3).to_string(),
            "Block 3: timeSignature 5/8 is not a supported time signature"
        );
    }

    #[test]
    fn test_position_attached() {
        let err = Block::new("verse", 4, "C", "Ionian", 0, "4/4")
            .unwrap_err()
            .at_position(2);
        assert_eq!(err.position(), Some(2));
        assert_eq!(err.to_string(), "Block 2: tempo must be a positive number");
    }

    #[test]
    fn test_song_creation() {
        let song = Song::new("My Song");
        assert_eq!(song.name(), "My Song");
        assert!(song.is_empty());
        assert!(song.timing_plan().is_empty());
    }

    #[test]
    fn test_empty_name_becomes_untitled() {
        let mut song = Song::new("");
        assert_eq!(song.name(), "Untitled");
        song.rename("Echoes of Joy");
        assert_eq!(song.name(), "Echoes of Joy");
    }

    #[test]
    fn test_insert_and_remove() {
        let mut song = Song::new("Test").with_block(verse(1)).with_block(verse(3));
        song.insert_block(1, verse(2)).unwrap();
        let measures: Vec<u32> = song.blocks().iter().map(|b| b.measures()).collect();
        assert_eq!(measures, vec![1, 2, 3]);

        assert!(song.insert_block(5, verse(9)).is_err());
        assert_eq!(song.remove_block(0).unwrap().measures(), 1);
        assert!(matches!(
            song.remove_block(7),
            Err(SongError::BlockIndex { index: 7, len: 2 })
        ));
    }

    #[test]
    fn test_move_block() {
        let mut song = Song::new("Test")
            .with_block(verse(1))
            .with_block(verse(2))
            .with_block(verse(3));

        song.move_block(0, 2).unwrap();
        let measures: Vec<u32> = song.blocks().iter().map(|b| b.measures()).collect();
        assert_eq!(measures, vec![2, 3, 1]);

        song.move_block(2, 0).unwrap();
        let measures: Vec<u32> = song.blocks().iter().map(|b| b.measures()).collect();
        assert_eq!(measures, vec![1, 2, 3]);

        assert!(song.move_block(0, 3).is_err());
        assert_eq!(song.len(), 3);
    }

    #[test]
    fn test_update_block() {
        let mut song = Song::new("Test").with_block(verse(4));
        let old = song.update_block(0, verse(8)).unwrap();
        assert_eq!(old.measures(), 4);
        assert_eq!(song.block(0).unwrap().measures(), 8);
        assert!(song.update_block(1, verse(2)).is_err());
    }

    #[test]
    fn test_plan_follows_edits() {
        let mut song = Song::new("Test").with_block(verse(4)).with_block(verse(8));
        assert_eq!(song.timing_plan().total_beats(), 48);
        song.remove_block(1).unwrap();
        assert_eq!(song.timing_plan().total_beats(), 16);
        song.clear();
        assert_eq!(song.timing_plan().total_beats(), 0);
        assert_eq!(song.total_measures(), 0);
    }

    #[test]
    fn test_time_signature_helpers() {
        assert!(is_valid_time_signature("11/8"));
        assert!(!is_valid_time_signature("1/1"));
        assert_eq!(check_time_signature("9/8").unwrap().beats_per_measure(), 3);
        assert!(check_time_signature("9/16").is_err());
    }
}
