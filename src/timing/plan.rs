// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Per-block timing and the cumulative timing plan for a song.
//!
//! The plan is a pure projection of the block sequence and is rebuilt from
//! scratch after every structural edit and at the start of every playback.

use crate::song::Block;

use super::meter::TimeSignature;

/// Timing of a single block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockTiming {
    /// Pulses per measure
    pub beats_per_measure: u32,
    /// measures * beats_per_measure
    pub total_beats: u64,
    /// total_beats * 60 / tempo
    pub duration_seconds: f64,
}

impl BlockTiming {
    /// Compute timing from raw block parameters
    pub fn compute(measures: u32, tempo: u32, time_signature: TimeSignature) -> Self {
        let beats_per_measure = time_signature.beats_per_measure();
        let total_beats = measures as u64 * beats_per_measure as u64;
        Self {
            beats_per_measure,
            total_beats,
            duration_seconds: beats_to_seconds(total_beats, tempo),
        }
    }

    /// Compute timing for a validated block
    pub fn for_block(block: &Block) -> Self {
        Self::compute(block.measures(), block.tempo(), block.time_signature())
    }
}

/// Seconds covered by `beats` at `tempo` BPM.
///
/// All duration math in the crate goes through here so sums stay
/// reproducible.
pub fn beats_to_seconds(beats: u64, tempo: u32) -> f64 {
    beats as f64 * 60.0 / tempo as f64
}

/// Duration of one beat in seconds
pub fn beat_duration(tempo: u32) -> f64 {
    60.0 / tempo as f64
}

/// A block's timing plus its cumulative position in the song
#[derive(Debug, Clone, PartialEq)]
pub struct TimingRecord {
    /// Index of the block in the song
    pub block_index: usize,
    /// Block tempo in BPM
    pub tempo: u32,
    /// Measures in the block
    pub measures: u32,
    /// Block time signature
    pub time_signature: TimeSignature,
    /// Pulses per measure
    pub beats_per_measure: u32,
    /// Total beats in the block
    pub total_beats: u64,
    /// Block length in seconds
    pub duration_seconds: f64,
    /// Sum of total_beats of all earlier blocks
    pub start_beat_offset: u64,
    /// Sum of duration_seconds of all earlier blocks
    pub start_time_offset: f64,
}

impl TimingRecord {
    /// Song time at which this block ends
    pub fn end_time(&self) -> f64 {
        self.start_time_offset + self.duration_seconds
    }

    /// Length of one beat in seconds
    pub fn beat_duration(&self) -> f64 {
        beat_duration(self.tempo)
    }
}

/// Cumulative timing of a block sequence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingPlan {
    records: Vec<TimingRecord>,
    total_seconds: f64,
    total_beats: u64,
    total_measures: u64,
}

impl TimingPlan {
    /// Fold an ordered block sequence into a plan
    pub fn build(blocks: &[Block]) -> Self {
        let mut plan = Self::default();

        for (block_index, block) in blocks.iter().enumerate() {
            let timing = BlockTiming::for_block(block);
            plan.records.push(TimingRecord {
                block_index,
                tempo: block.tempo(),
                measures: block.measures(),
                time_signature: block.time_signature(),
                beats_per_measure: timing.beats_per_measure,
                total_beats: timing.total_beats,
                duration_seconds: timing.duration_seconds,
                start_beat_offset: plan.total_beats,
                start_time_offset: plan.total_seconds,
            });

            plan.total_seconds += timing.duration_seconds;
            plan.total_beats += timing.total_beats;
            plan.total_measures += block.measures() as u64;
        }

        plan
    }

    /// Per-block records in song order
    pub fn records(&self) -> &[TimingRecord] {
        &self.records
    }

    /// Record for a block
    pub fn record(&self, index: usize) -> Option<&TimingRecord> {
        self.records.get(index)
    }

    /// Total song length in seconds
    pub fn total_seconds(&self) -> f64 {
        self.total_seconds
    }

    /// Total beats in the song
    pub fn total_beats(&self) -> u64 {
        self.total_beats
    }

    /// Total measures in the song
    pub fn total_measures(&self) -> u64 {
        self.total_measures
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// An empty plan has nothing to play
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

}
