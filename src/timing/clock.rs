// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Beat clock.
//!
//! A polled clock that turns frame timestamps into beat events. Every poll
//! recomputes the beat index from the elapsed time since the recorded start
//! instant, so rescheduling overhead never accumulates into drift. Each beat
//! index is emitted exactly once, even when several frames land inside the
//! same beat or one frame jumps over several beats.

use tracing::debug;

use super::plan::beat_duration;

/// Beat clock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    /// Never started
    Idle,
    /// Emitting beats
    Running,
    /// Finished or cancelled
    Stopped,
}

/// One beat emitted by the clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockBeat {
    /// Seconds since the clock's start instant, as observed by the frame
    pub elapsed_time: f64,
    /// Beat index from 0
    pub beat: u64,
    /// Measure number from 1
    pub measure: u64,
    /// beat % beats_per_measure == 0
    pub is_first_beat_of_measure: bool,
}

/// Per-block beat clock
#[derive(Debug, Clone)]
pub struct BeatClock {
    /// Tempo in BPM
    tempo: u32,
    /// Pulses per measure
    beats_per_measure: u32,
    /// Highest beat index to emit; 0 or less emits nothing
    total_beats_to_emit: i64,
    /// Seconds per beat
    beat_duration: f64,
    /// Current state
    state: ClockState,
    /// Frame-clock instant of beat 0
    start_time: Option<f64>,
    /// Last beat index handed to the callback
    last_beat: Option<u64>,
}

impl BeatClock {
    /// Create a clock.
    ///
    /// Tempo and beats per measure are validated upstream; zero is raised to
    /// one so the clock can never divide by zero.
    pub fn new(tempo: u32, beats_per_measure: u32, total_beats_to_emit: i64) -> Self {
        let tempo = tempo.max(1);
        Self {
            tempo,
            beats_per_measure: beats_per_measure.max(1),
            total_beats_to_emit,
            beat_duration: beat_duration(tempo),
            state: ClockState::Idle,
            start_time: None,
            last_beat: None,
        }
    }

    /// Get the tempo in BPM
    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    /// Get pulses per measure
    pub fn beats_per_measure(&self) -> u32 {
        self.beats_per_measure
    }

    /// Get the highest beat index this clock emits
    pub fn total_beats_to_emit(&self) -> i64 {
        self.total_beats_to_emit
    }

    /// Seconds per beat
    pub fn beat_duration(&self) -> f64 {
        self.beat_duration
    }

    /// Get the current state
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Check if running
    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    /// Last emitted beat index
    pub fn last_beat(&self) -> Option<u64> {
        self.last_beat
    }

    /// Instant the clock was started at
    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    /// Frame-clock instant at which the clock stops on its own
    pub fn end_time(&self) -> Option<f64> {
        let beats = (self.total_beats_to_emit.max(0) + 1) as f64;
        self.start_time.map(|start| start + beats * self.beat_duration)
    }

    /// Start the clock with `now` as beat 0
    pub fn start(&mut self, now: f64) {
        self.start_at(now);
    }

    /// Start the clock with beat 0 at an explicit instant.
    ///
    /// The instant may lie in the future; polls before it emit nothing.
    /// Restarting a stopped clock begins again from beat 0.
    pub fn start_at(&mut self, start: f64) {
        self.start_time = Some(start);
        self.last_beat = None;
        self.state = if self.total_beats_to_emit <= 0 {
            ClockState::Stopped
        } else {
            ClockState::Running
        };
    }

    /// Cancel the clock; no further beats are emitted
    pub fn stop(&mut self) {
        self.state = ClockState::Stopped;
    }

    /// Poll the clock at frame time `now`, emitting any new beats in order.
    ///
    /// Returns the state after the poll; `Stopped` means the caller should
    /// not poll again.
    pub fn tick<F>(&mut self, now: f64, mut on_beat: F) -> ClockState
    where
        F: FnMut(ClockBeat),
    {
        if self.state != ClockState::Running {
            return self.state;
        }
        let Some(start) = self.start_time else {
            return self.state;
        };

        let elapsed = now - start;
        if elapsed < 0.0 {
            return self.state;
        }

        let current = (elapsed / self.beat_duration).floor() as u64;
        let last_allowed = self.total_beats_to_emit as u64;
        let target = current.min(last_allowed);
        let first = self.last_beat.map_or(0, |b| b + 1);

        if target >= first {
            if target > first {
                debug!(
                    skipped = target - first,
                    tempo = self.tempo,
                    "frame interval exceeded a beat, catching up"
                );
            }
            for beat in first..=target {
                on_beat(self.beat_event(beat, elapsed));
            }
            self.last_beat = Some(target);
        }

        if current > last_allowed {
            self.state = ClockState::Stopped;
        }

        self.state
    }

    fn beat_event(&self, beat: u64, elapsed_time: f64) -> ClockBeat {
        let per_measure = self.beats_per_measure as u64;
        ClockBeat {
            elapsed_time,
            beat,
            measure: beat / per_measure + 1,
            is_first_beat_of_measure: beat % per_measure == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Poll a clock at a fixed frame interval until it stops
    fn run(clock: &mut BeatClock, frame: f64) -> Vec<ClockBeat> {
        let mut beats = Vec::new();
        clock.start(0.0);
        let mut now = 0.0;
        while clock.tick(now, |b| beats.push(b)) == ClockState::Running {
            now += frame;
            assert!(now < 1000.0, "clock never stopped");
        }
        beats
    }

    #[test]
    fn test_clock_creation() {
        let clock = BeatClock::new(120, 4, 15);
        assert_eq!(clock.state(), ClockState::Idle);
        assert_eq!(clock.beat_duration(), 0.5);
        assert_eq!(clock.last_beat(), None);
    }

    #[test]
    fn test_zero_tempo_raised() {
        let clock = BeatClock::new(0, 0, 4);
        assert_eq!(clock.tempo(), 1);
        assert_eq!(clock.beats_per_measure(), 1);
    }

    #[test]
    fn test_full_run_emits_k_plus_one_beats() {
        let mut clock = BeatClock::new(120, 4, 15);
        let beats = run(&mut clock, 1.0 / 60.0);

        assert_eq!(beats.len(), 16);
        for (i, beat) in beats.iter().enumerate() {
            assert_eq!(beat.beat, i as u64);
            assert_eq!(beat.measure, i as u64 / 4 + 1);
            assert_eq!(beat.is_first_beat_of_measure, i % 4 == 0);
        }
        assert_eq!(clock.state(), ClockState::Stopped);
    }

    #[test]
    fn test_at_most_one_callback_per_beat() {
        let mut clock = BeatClock::new(60, 3, 5);
        let beats = run(&mut clock, 0.001);
        let indices: Vec<u64> = beats.iter().map(|b| b.beat).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_slow_frames_catch_up() {
        // 300 BPM is 0.2s per beat; 0.45s frames jump two beats at a time
        let mut clock = BeatClock::new(300, 4, 7);
        let beats = run(&mut clock, 0.45);
        let indices: Vec<u64> = beats.iter().map(|b| b.beat).collect();
        assert_eq!(indices, (0..=7).collect::<Vec<_>>());
    }

    #[test]
    fn test_non_positive_total_emits_nothing() {
        for total in [0, -3] {
            let mut clock = BeatClock::new(120, 4, total);
            clock.start(0.0);
            assert_eq!(clock.state(), ClockState::Stopped);
            let mut count = 0;
            clock.tick(5.0, |_| count += 1);
            assert_eq!(count, 0);
        }
    }

    #[test]
    fn test_stop_cancels_further_beats() {
        let mut clock = BeatClock::new(120, 4, 15);
        let mut beats = Vec::new();
        clock.start(0.0);
        clock.tick(0.0, |b| beats.push(b));
        clock.tick(0.6, |b| beats.push(b));
        clock.stop();
        assert_eq!(clock.tick(3.0, |b| beats.push(b)), ClockState::Stopped);
        assert_eq!(beats.len(), 2);
    }

    #[test]
    fn test_restart_begins_fresh() {
        let mut clock = BeatClock::new(120, 4, 3);
        let mut beats = Vec::new();
        clock.start(0.0);
        clock.tick(1.2, |b| beats.push(b.beat));
        clock.stop();

        clock.start(10.0);
        assert!(clock.is_running());
        assert_eq!(clock.last_beat(), None);
        clock.tick(10.1, |b| beats.push(b.beat));
        assert_eq!(beats, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_future_start_waits() {
        let mut clock = BeatClock::new(120, 4, 3);
        let mut count = 0;
        clock.start_at(2.0);
        assert_eq!(clock.tick(1.9, |_| count += 1), ClockState::Running);
        assert_eq!(count, 0);
        clock.tick(2.0, |_| count += 1);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_end_time_matches_stop_condition() {
        let mut clock = BeatClock::new(90, 2, 3);
        clock.start_at(1.0);
        let end = clock.end_time().unwrap();
        assert!((end - (1.0 + 4.0 * 60.0 / 90.0)).abs() < 1e-12);

        let mut count = 0;
        assert_eq!(clock.tick(end - 1e-6, |_| count += 1), ClockState::Running);
        assert_eq!(clock.tick(end + 1e-6, |_| count += 1), ClockState::Stopped);
        assert_eq!(count, 4);
    }
}
