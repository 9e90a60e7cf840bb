// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Text formatting for the player display.

use crate::playback::PlaybackState;
use crate::song::Block;
use crate::timing::TimingPlan;

/// Roots written without a space before the mode initial
const ACCIDENTAL_ROOTS: [&str; 5] = ["C#", "D#", "F#", "G#", "A#"];

/// Longest lyric shown before truncation
const MAX_LYRIC_CHARS: usize = 30;

/// Format seconds as `m:ss`
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Capitalize a block type for display
pub fn format_part(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Root note plus mode initial, e.g. "C I" or "F#D"
pub fn abbreviate_key(root_note: &str, mode: &str) -> String {
    let separator = if ACCIDENTAL_ROOTS.contains(&root_note) { "" } else { " " };
    let initial = mode.chars().next().map(String::from).unwrap_or_default();
    format!("{}{}{}", root_note, separator, initial)
}

/// Shorten long lyrics to 27 characters plus "..."
pub fn truncate_lyrics(lyrics: &str) -> String {
    if lyrics.chars().count() > MAX_LYRIC_CHARS {
        let head: String = lyrics.chars().take(MAX_LYRIC_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        lyrics.to_string()
    }
}

/// Headline for a block, e.g. "Verse: 4/4 8m"
pub fn block_title(block: &Block) -> String {
    format!(
        "{}: {} {}m",
        format_part(block.kind()),
        block.time_signature(),
        block.measures()
    )
}

/// Key, tempo and feel, e.g. "C I Ionian 120b Calmness"
pub fn block_details(block: &Block) -> String {
    let details = format!(
        "{} {} {}b {}",
        abbreviate_key(block.root_note(), block.mode()),
        block.mode(),
        block.tempo(),
        block.feel()
    );
    details.trim_end().to_string()
}

/// One-line summary of the playback position
pub fn status_line(state: &PlaybackState, plan: &TimingPlan) -> String {
    let (block_beat, block_beats, measure, measures) = match plan.record(state.current_block_index) {
        Some(record) if state.is_playing && !state.in_lead_in => (
            state.beat_within_block,
            record.total_beats,
            state.measure_within_block,
            record.measures,
        ),
        _ => (0, 0, 0, 0),
    };

    format!(
        "Current Time: {} / Total Duration: {} | Song Beat: {} of {} | Block: {} of {} (Measure: {} of {})",
        format_duration(state.elapsed_song_seconds),
        format_duration(plan.total_seconds()),
        state.elapsed_song_beats,
        plan.total_beats(),
        block_beat,
        block_beats,
        measure,
        measures
    )
}
