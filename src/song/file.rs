// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Song file format.
//!
//! Songs are stored as JSON:
//!
//! ```json
//! { "songName": "Echoes of Joy",
//!   "blocks": [ { "type": "intro", "measures": 4, "rootNote": "C",
//!                 "mode": "Ionian", "tempo": 120, "timeSignature": "4/4",
//!                 "feel": "Happiness", "lyrics": "" } ] }
//! ```
//!
//! Block fields are kept as raw JSON values until validation so that a bad
//! field is reported with its block position instead of as a parse error.
//! `measures` and `tempo` may be integers or numeric strings.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{Block, Song, SongError};

/// Required block fields in validation order
const REQUIRED_FIELDS: [&str; 6] = ["type", "measures", "rootNote", "mode", "tempo", "timeSignature"];

/// Root of a song file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SongFile {
    /// Song name
    pub song_name: String,
    /// Blocks in playback order
    pub blocks: Vec<BlockEntry>,
}

/// One block as it appears in a song file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockEntry {
    /// Section type
    #[serde(rename = "type", default)]
    pub kind: Value,
    /// Measure count
    #[serde(default)]
    pub measures: Value,
    /// Root note
    #[serde(default)]
    pub root_note: Value,
    /// Mode
    #[serde(default)]
    pub mode: Value,
    /// Tempo in BPM
    #[serde(default)]
    pub tempo: Value,
    /// Time signature label
    #[serde(default)]
    pub time_signature: Value,
    /// Mood label
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub feel: Value,
    /// Lyrics
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub lyrics: Value,
}

impl BlockEntry {
    fn field(&self, name: &str) -> &Value {
        match name {
            "type" => &self.kind,
            "measures" => &self.measures,
            "rootNote" => &self.root_note,
            "mode" => &self.mode,
            "tempo" => &self.tempo,
            "timeSignature" => &self.time_signature,
            "feel" => &self.feel,
            "lyrics" => &self.lyrics,
            _ => &Value::Null,
        }
    }

    /// Validate this entry into a block
    pub fn to_block(&self) -> Result<Block, SongError> {
        for name in REQUIRED_FIELDS {
            if is_blank(self.field(name)) {
                return Err(SongError::invalid(name, "is missing or empty"));
            }
        }

        let block = Block::new(
            text_field("type", &self.kind)?,
            count_field("measures", &self.measures)?,
            text_field("rootNote", &self.root_note)?,
            text_field("mode", &self.mode)?,
            count_field("tempo", &self.tempo)?,
            &text_field("timeSignature", &self.time_signature)?,
        )?;

        Ok(block
            .with_feel(text_field("feel", &self.feel)?)
            .with_lyrics(text_field("lyrics", &self.lyrics)?))
    }

    /// File entry for a block
    pub fn from_block(block: &Block) -> Self {
        Self {
            kind: Value::from(block.kind()),
            measures: Value::from(block.measures()),
            root_note: Value::from(block.root_note()),
            mode: Value::from(block.mode()),
            tempo: Value::from(block.tempo()),
            time_signature: Value::from(block.time_signature().to_string()),
            feel: Value::from(block.feel()),
            lyrics: Value::from(block.lyrics()),
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn text_field(field: &'static str, value: &Value) -> Result<String, SongError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(SongError::invalid(field, "must be text")),
    }
}

fn count_field(field: &'static str, value: &Value) -> Result<u32, SongError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n > 0 => Ok(n),
        _ => Err(SongError::invalid(field, "must be a positive number")),
    }
}

impl SongFile {
    /// Parse a song file from a JSON string
    pub fn from_json(json: &str) -> Result<Self, SongError> {
        let value: Value = serde_json::from_str(json)?;

        let has_name = value
            .get("songName")
            .and_then(Value::as_str)
            .is_some_and(|name| !name.is_empty());
        if !has_name {
            return Err(SongError::InvalidFormat("missing songName".to_string()));
        }
        if !value.get("blocks").is_some_and(Value::is_array) {
            return Err(SongError::InvalidFormat("blocks must be a list".to_string()));
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Serialize to a pretty-printed JSON string
    pub fn to_json(&self) -> Result<String, SongError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate every block and build a song.
    ///
    /// The first invalid block aborts the conversion with its 1-based
    /// position.
    pub fn into_song(self) -> Result<Song, SongError> {
        let mut song = Song::new(self.song_name);
        for (index, entry) in self.blocks.iter().enumerate() {
            let block = entry.to_block().map_err(|e| e.at_position(index + 1))?;
            song.push_block(block);
        }
        Ok(song)
    }

    /// File representation of a song
    pub fn from_song(song: &Song) -> Self {
        Self {
            song_name: song.name().to_string(),
            blocks: song.blocks().iter().map(BlockEntry::from_block).collect(),
        }
    }
}

impl Song {
    /// Parse and validate a song from JSON
    pub fn from_json(json: &str) -> Result<Self, SongError> {
        let result = SongFile::from_json(json).and_then(SongFile::into_song);
        match &result {
            Ok(song) => debug!(song = song.name(), blocks = song.len(), "song parsed"),
            Err(e) => warn!(error = %e, "song rejected"),
        }
        result
    }

    /// Export as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, SongError> {
        SongFile::from_song(self).to_json()
    }

    /// Load a song from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SongError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| SongError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Save the song to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SongError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| SongError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const ECHOES: &str = r#"{
        "songName": "Echoes of Joy",
        "blocks": [
            { "type": "intro", "measures": "4", "rootNote": "C", "mode": "Ionian",
              "tempo": "120", "timeSignature": "4/4", "feel": "Happiness",
              "lyrics": "Echoes in the air" },
            { "type": "verse", "measures": 8, "rootNote": "C", "mode": "Ionian",
              "tempo": 120, "timeSignature": "4/4" }
        ]
    }"#;

    #[test]
    fn test_parse_song() {
        let song = Song::from_json(ECHOES).unwrap();
        assert_eq!(song.name(), "Echoes of Joy");
        assert_eq!(song.len(), 2);
        assert_eq!(song.block(0).unwrap().measures(), 4);
        assert_eq!(song.block(0).unwrap().lyrics(), "Echoes in the air");
        assert_eq!(song.block(1).unwrap().feel(), "");
        assert_eq!(song.timing_plan().total_beats(), 48);
    }

    #[test]
    fn test_export_uses_integers() {
        let song = Song::from_json(ECHOES).unwrap();
        let json = song.to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["songName"], "Echoes of Joy");
        assert_eq!(value["blocks"][0]["measures"], 4);
        assert_eq!(value["blocks"][0]["tempo"], 120);
        assert_eq!(value["blocks"][1]["feel"], "");
        assert_eq!(Song::from_json(&json).unwrap(), song);
    }

    #[test]
    fn test_second_block_zero_tempo() {
        let json = r#"{ "songName": "Bad", "blocks": [
            { "type": "intro", "measures": 4, "rootNote": "C", "mode": "Ionian", "tempo": 120, "timeSignature": "4/4" },
            { "type": "verse", "measures": 4, "rootNote": "C", "mode": "Ionian", "tempo": 0, "timeSignature": "4/4" }
        ] }"#;
        let err = Song::from_json(json).unwrap_err();
        assert_eq!(err.position(), Some(2));
        assert_eq!(err.field(), Some("tempo"));
        assert!(err.to_string().starts_with("Block 2: tempo"));
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        let json = r#"{ "songName": "Bad", "blocks": [
            { "type": "intro", "measures": 0, "rootNote": "C", "tempo": 120, "timeSignature": "4/4" }
        ] }"#;
        let err = Song::from_json(json).unwrap_err();
        assert_eq!(err.position(), Some(1));
        assert_eq!(err.field(), Some("mode"));
    }

    #[test]
    fn test_bad_numbers_rejected() {
        for bad in [r#""-2""#, "-2", "2.5", r#""abc""#, "true"] {
            let json = format!(
                r#"{{ "songName": "Bad", "blocks": [
                    {{ "type": "intro", "measures": {}, "rootNote": "C", "mode": "Ionian", "tempo": 120, "timeSignature": "4/4" }}
                ] }}"#,
                bad
            );
            let err = Song::from_json(&json).unwrap_err();
            assert_eq!(err.field(), Some("measures"), "input {}", bad);
        }
    }

    #[test]
    fn test_unsupported_time_signature_has_position() {
        let json = r#"{ "songName": "Bad", "blocks": [
            { "type": "intro", "measures": 4, "rootNote": "C", "mode": "Ionian", "tempo": 120, "timeSignature": "5/8" }
        ] }"#;
        let err = Song::from_json(json).unwrap_err();
        assert!(matches!(err, SongError::UnsupportedMeter { position: Some(1), .. }));
    }

    #[test]
    fn test_invalid_format() {
        assert!(matches!(
            Song::from_json(r#"{ "blocks": [] }"#),
            Err(SongError::InvalidFormat(_))
        ));
        assert!(matches!(
            Song::from_json(r#"{ "songName": "X", "blocks": {} }"#),
            Err(SongError::InvalidFormat(_))
        ));
        assert!(matches!(Song::from_json("not json"), Err(SongError::Json(_))));
    }

    #[test]
    fn test_failed_import_leaves_song_unchanged() {
        let mut song = Song::from_json(ECHOES).unwrap();
        let before = song.clone();
        let bad = r#"{ "songName": "Other", "blocks": [
            { "type": "intro", "measures": 4, "rootNote": "C", "mode": "Ionian", "tempo": 120, "timeSignature": "4/4" },
            { "type": "verse", "measures": 4, "rootNote": "C", "mode": "Ionian", "tempo": 0, "timeSignature": "4/4" }
        ] }"#;
        assert!(song.import_json(bad).is_err());
        assert_eq!(song, before);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("echoes.json");

        let song = Song::from_json(ECHOES).unwrap();
        song.save(&path).unwrap();
        let loaded = Song::load(&path).unwrap();
        assert_eq!(loaded, song);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = Song::load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, SongError::Io { .. }));
    }
}
