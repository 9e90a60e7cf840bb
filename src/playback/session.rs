// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback session.
//!
//! The session owns one beat clock at a time. Every clock start instant and
//! every cue instant is derived from the single [`ClockSync`] pair recorded
//! in [`PlaybackSession::play`] plus offsets from the timing plan, so block
//! boundaries on the frame clock and on the audio clock always agree.
//!
//! Clicks for a block are queued when the previous section begins, which
//! keeps the first click of each block ahead of the audio clock.

use tracing::{debug, info, trace};

use super::{BeatEvent, PlaybackObserver, PlaybackState};
use crate::audio::{CueKind, CueSink, SampleBank};
use crate::timing::plan::{beat_duration, beats_to_seconds};
use crate::timing::{BeatClock, ClockBeat, ClockState, ClockSync, TimingPlan};

/// Session settings
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Count in one measure before the first block
    pub lead_in: bool,
    /// Seconds between `play` and the first beat
    pub start_delay: f64,
    /// Tempo at or above which short clicks are preferred
    pub short_sample_tempo: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            lead_in: true,
            start_delay: 0.05,
            short_sample_tempo: 160,
        }
    }
}

/// Section currently driven by the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    LeadIn,
    Block(usize),
}

/// Plays a timing plan against a cue sink
pub struct PlaybackSession<S: CueSink, O: PlaybackObserver> {
    /// Audio destination
    sink: S,
    /// Beat and block listener
    observer: O,
    /// Click samples
    samples: SampleBank,
    /// Settings
    options: SessionOptions,
    /// Plan being played
    plan: TimingPlan,
    /// Public playback position
    state: PlaybackState,
    /// Reference instants for this play-through
    sync: Option<ClockSync>,
    /// Clock for the current section
    clock: Option<BeatClock>,
    /// Current section
    phase: Phase,
    /// Length of the count in, 0 when disabled
    lead_in_seconds: f64,
    /// Beats collected during one clock poll
    beat_buffer: Vec<ClockBeat>,
}

impl<S: CueSink, O: PlaybackObserver> PlaybackSession<S, O> {
    /// Create an idle session
    pub fn new(sink: S, samples: SampleBank, observer: O) -> Self {
        Self {
            sink,
            observer,
            samples,
            options: SessionOptions::default(),
            plan: TimingPlan::default(),
            state: PlaybackState::default(),
            sync: None,
            clock: None,
            phase: Phase::LeadIn,
            lead_in_seconds: 0.0,
            beat_buffer: Vec::with_capacity(16),
        }
    }

    /// Builder: set options
    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Get options
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Get the playback position
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Check if playing
    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    /// Plan of the current (or last) play-through
    pub fn plan(&self) -> &TimingPlan {
        &self.plan
    }

    /// Reference instants of the current play-through
    pub fn sync(&self) -> Option<ClockSync> {
        self.sync
    }

    /// Length of the count in
    pub fn lead_in_seconds(&self) -> f64 {
        self.lead_in_seconds
    }

    /// Get the observer
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Get the observer mutably
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Get the cue sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Get the cue sink mutably
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Song position at frame time `now`, clamped to the plan.
    ///
    /// Negative during the count in is reported as zero.
    pub fn song_time_at(&self, now: f64) -> f64 {
        match self.sync {
            Some(sync) if self.state.is_playing => (now - sync.wall_at(self.lead_in_seconds))
                .clamp(0.0, self.plan.total_seconds()),
            _ => 0.0,
        }
    }

    /// Start playing `plan` with frame time `now`.
    ///
    /// Returns false, without touching anything, when the plan is empty.
    /// Calling this while playing stops the current play-through first.
    pub fn play(&mut self, plan: TimingPlan, now: f64) -> bool {
        let Some(first) = plan.record(0).cloned() else {
            debug!("nothing to play");
            return false;
        };
        if self.state.is_playing {
            debug!("restarting playback");
            self.stop();
        }

        let sync = ClockSync::new(
            now + self.options.start_delay,
            self.sink.now() + self.options.start_delay,
        );
        self.sync = Some(sync);
        self.plan = plan;
        self.state.reset();
        self.state.is_playing = true;

        info!(
            blocks = self.plan.len(),
            seconds = self.plan.total_seconds(),
            beats = self.plan.total_beats(),
            "playback started"
        );

        if self.options.lead_in {
            let beats = first.beats_per_measure as u64;
            self.lead_in_seconds = beats_to_seconds(beats, first.tempo);
            self.schedule_section(0.0, beats, first.tempo, first.beats_per_measure);

            let mut clock = BeatClock::new(first.tempo, first.beats_per_measure, beats as i64 - 1);
            clock.start_at(sync.wall_start());
            self.clock = Some(clock);
            self.phase = Phase::LeadIn;
            self.state.in_lead_in = true;
            self.schedule_block(0);
        } else {
            self.lead_in_seconds = 0.0;
            self.schedule_block(0);
            self.enter_block(0);
        }

        true
    }

    /// Poll at frame time `now`. Returns whether playback is still running.
    pub fn tick(&mut self, now: f64) -> bool {
        while self.state.is_playing {
            let Some(clock) = self.clock.as_mut() else {
                break;
            };

            let mut beats = std::mem::take(&mut self.beat_buffer);
            let clock_state = clock.tick(now, |beat| beats.push(beat));
            for beat in beats.drain(..) {
                self.handle_beat(beat);
            }
            self.beat_buffer = beats;

            if clock_state != ClockState::Stopped {
                break;
            }

            // The next section starts exactly where this one stopped, so it
            // may already have beats due in this frame.
            match self.phase {
                Phase::LeadIn => self.enter_block(0),
                Phase::Block(index) if index + 1 < self.plan.len() => self.enter_block(index + 1),
                Phase::Block(_) => self.finish(),
            }
        }

        if self.state.is_playing && matches!(self.phase, Phase::Block(_)) {
            let song_time = self.song_time_at(now);
            self.observer.on_frame(song_time);
        }
        self.state.is_playing
    }

    /// Stop playback, cancel queued clicks and reset the position.
    ///
    /// Does nothing when idle.
    pub fn stop(&mut self) {
        if !self.state.is_playing {
            return;
        }
        if let Some(clock) = self.clock.as_mut() {
            clock.stop();
        }
        self.teardown();
        info!("playback stopped");
        self.observer.on_stop();
    }

    fn finish(&mut self) {
        self.teardown();
        info!("playback finished");
        self.observer.on_playback_end();
    }

    fn teardown(&mut self) {
        // Only this session schedules on the sink, so everything it holds is ours
        self.sink.cancel_all();
        self.clock = None;
        self.sync = None;
        self.phase = Phase::LeadIn;
        self.state.reset();
    }

    fn enter_block(&mut self, index: usize) {
        let (Some(record), Some(sync)) = (self.plan.record(index).cloned(), self.sync) else {
            self.finish();
            return;
        };

        let mut clock = BeatClock::new(
            record.tempo,
            record.beats_per_measure,
            record.total_beats as i64 - 1,
        );
        clock.start_at(sync.wall_at(self.lead_in_seconds + record.start_time_offset));
        self.clock = Some(clock);
        self.phase = Phase::Block(index);

        self.state.in_lead_in = false;
        self.state.current_block_index = index;
        self.state.beat_within_block = 0;
        self.state.measure_within_block = 0;

        debug!(
            block = index,
            tempo = record.tempo,
            meter = %record.time_signature,
            "block started"
        );
        self.observer.on_block_change(index);
        self.schedule_block(index + 1);
    }

    fn handle_beat(&mut self, beat: ClockBeat) {
        let (block_index, song_beat, song_time) = match self.phase {
            Phase::LeadIn => (None, 0, 0.0),
            Phase::Block(index) => match self.plan.record(index) {
                Some(record) => (
                    Some(index),
                    record.start_beat_offset + beat.beat,
                    record.start_time_offset + beat.elapsed_time,
                ),
                None => return,
            },
        };

        let event = BeatEvent {
            block_index,
            elapsed_time: beat.elapsed_time,
            beat_index: beat.beat,
            measure_index: beat.measure,
            is_first_beat_of_measure: beat.is_first_beat_of_measure,
            song_beat,
            song_time,
        };
        self.state.apply(&event);
        trace!(?event, "beat");
        self.observer.on_beat(&event);
    }

    /// Queue the clicks for a block; out-of-range indices are ignored
    fn schedule_block(&mut self, index: usize) {
        if let Some(record) = self.plan.record(index).cloned() {
            self.schedule_section(
                self.lead_in_seconds + record.start_time_offset,
                record.total_beats,
                record.tempo,
                record.beats_per_measure,
            );
        }
    }

    fn schedule_section(&mut self, offset: f64, beats: u64, tempo: u32, beats_per_measure: u32) {
        let Some(sync) = self.sync else {
            return;
        };
        let duration = beat_duration(tempo);
        let per_measure = beats_per_measure.max(1) as u64;

        for beat in 0..beats {
            let kind = CueKind::for_beat(beat % per_measure == 0);
            match self.samples.select(kind, tempo, self.options.short_sample_tempo) {
                Some(sample) => {
                    let at = sync.audio_beat(offset, beat, duration);
                    self.sink.schedule(sample, at);
                }
                None => trace!(?kind, beat, "no sample, cue skipped"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{CueMixer, NullCueSink, Sample};
    use crate::song::Block;

    #[derive(Debug, Default)]
    struct Recorder {
        beats: Vec<BeatEvent>,
        blocks: Vec<usize>,
        frames: Vec<f64>,
        ended: usize,
        stopped: usize,
    }

    impl PlaybackObserver for Recorder {
        fn on_beat(&mut self, event: &BeatEvent) {
            self.beats.push(*event);
        }

        fn on_block_change(&mut self, block_index: usize) {
            self.blocks.push(block_index);
        }

        fn on_frame(&mut self, song_time: f64) {
            self.frames.push(song_time);
        }

        fn on_playback_end(&mut self) {
            self.ended += 1;
        }

        fn on_stop(&mut self) {
            self.stopped += 1;
        }
    }

    fn bank() -> SampleBank {
        SampleBank::new(
            Some(Sample::from_frames("tock", vec![0.5; 4], 44100)),
            Some(Sample::from_frames("tick", vec![0.25; 4], 44100)),
        )
    }

    fn plan(blocks: &[(u32, u32, &str)]) -> TimingPlan {
        let blocks: Vec<Block> = blocks
            .iter()
            .map(|(measures, tempo, meter)| {
                Block::new("verse", *measures, "C", "Ionian", *tempo, meter).unwrap()
            })
            .collect();
        TimingPlan::build(&blocks)
    }

    fn session(lead_in: bool) -> PlaybackSession<NullCueSink, Recorder> {
        PlaybackSession::new(NullCueSink::recording(), bank(), Recorder::default()).with_options(
            SessionOptions {
                lead_in,
                start_delay: 0.0,
                short_sample_tempo: 160,
            },
        )
    }

    /// Drive a session at a fixed frame interval until it stops
    fn run(session: &mut PlaybackSession<NullCueSink, Recorder>, frame: f64) -> f64 {
        let mut now = 0.0;
        while session.tick(now) {
            now += frame;
            assert!(now < 1000.0, "session never finished");
        }
        now
    }

    #[test]
    fn test_empty_plan_is_noop() {
        let mut session = session(true);
        assert!(!session.play(TimingPlan::default(), 0.0));
        assert!(!session.is_playing());
        assert!(session.sink().cues().is_empty());
        assert_eq!(session.observer().ended, 0);
    }

    #[test]
    fn test_full_run_without_lead_in() {
        let mut session = session(false);
        assert!(session.play(plan(&[(2, 120, "4/4"), (1, 120, "3/4")]), 0.0));
        let end = run(&mut session, 1.0 / 60.0);

        let recorder = session.observer();
        assert_eq!(recorder.blocks, vec![0, 1]);
        assert_eq!(recorder.ended, 1);
        assert_eq!(recorder.beats.len(), 8 + 3);

        let song_beats: Vec<u64> = recorder.beats.iter().map(|b| b.song_beat).collect();
        assert_eq!(song_beats, (0..11).collect::<Vec<_>>());
        assert_eq!(recorder.beats[8].block_index, Some(1));
        assert_eq!(recorder.beats[8].beat_index, 0);
        assert!(recorder.beats[8].is_first_beat_of_measure);

        // 11 beats at 0.5s
        assert!(end >= 5.5 && end < 5.6);
        assert_eq!(session.state(), &PlaybackState::default());
    }

    #[test]
    fn test_lead_in_counts_one_measure() {
        let mut session = session(true);
        session.play(plan(&[(1, 120, "6/8")]), 0.0);
        assert!(session.state().in_lead_in);
        assert_eq!(session.lead_in_seconds(), 1.0);
        run(&mut session, 0.01);

        let recorder = session.observer();
        let lead_in: Vec<&BeatEvent> = recorder.beats.iter().filter(|b| b.is_lead_in()).collect();
        assert_eq!(lead_in.len(), 2);
        assert!(lead_in[0].is_first_beat_of_measure);
        assert!(!lead_in[1].is_first_beat_of_measure);
        assert_eq!(recorder.beats.len(), 4);
        assert_eq!(recorder.blocks, vec![0]);
    }

    #[test]
    fn test_cue_accents_and_instants() {
        let mut session = session(true);
        session.sink_mut().set_now(10.0);
        session.play(plan(&[(1, 120, "3/4"), (1, 60, "2/4")]), 0.0);
        run(&mut session, 0.02);

        let cues = session.sink().cues();
        let names: Vec<&str> = cues.iter().map(|c| c.sample.as_str()).collect();
        assert_eq!(
            names,
            vec!["tock", "tick", "tick", "tock", "tick", "tick", "tock", "tick"]
        );

        let instants: Vec<f64> = cues.iter().map(|c| c.at).collect();
        let expected = [10.0, 10.5, 11.0, 11.5, 12.0, 12.5, 13.0, 14.0];
        for (at, want) in instants.iter().zip(expected) {
            assert!((at - want).abs() < 1e-9, "{} != {}", at, want);
        }
    }

    #[test]
    fn test_short_samples_at_fast_tempo() {
        let samples = bank().with_short(
            Some(Sample::from_frames("tock_short", vec![0.5], 44100)),
            Some(Sample::from_frames("tick_short", vec![0.5], 44100)),
        );
        let mut session = PlaybackSession::new(NullCueSink::recording(), samples, ())
            .with_options(SessionOptions {
                lead_in: false,
                start_delay: 0.0,
                short_sample_tempo: 160,
            });
        session.play(plan(&[(1, 180, "2/4")]), 0.0);

        let names: Vec<&str> = session.sink().cues().iter().map(|c| c.sample.as_str()).collect();
        assert_eq!(names, vec!["tock_short", "tick_short"]);
    }

    #[test]
    fn test_missing_samples_play_silently() {
        let mut session = PlaybackSession::new(NullCueSink::recording(), SampleBank::empty(), Recorder::default())
            .with_options(SessionOptions {
                lead_in: false,
                start_delay: 0.0,
                short_sample_tempo: 160,
            });
        session.play(plan(&[(2, 120, "4/4")]), 0.0);
        let mut now = 0.0;
        while session.tick(now) {
            now += 0.05;
        }
        assert!(session.sink().cues().is_empty());
        assert_eq!(session.observer().beats.len(), 8);
        assert_eq!(session.observer().ended, 1);
    }

    #[test]
    fn test_stop_mid_block() {
        let mut session = session(false);
        session.play(plan(&[(4, 120, "4/4"), (4, 120, "4/4")]), 0.0);

        let mut now = 0.0;
        while now < 3.0 {
            session.tick(now);
            now += 1.0 / 60.0;
        }
        let beats_before = session.observer().beats.len();
        assert!(beats_before > 0);
        assert!(session.state().elapsed_song_beats > 0);

        session.stop();
        assert_eq!(session.state(), &PlaybackState::default());
        assert!(session.sink().live_cues().next().is_none());

        assert_eq!(session.observer().stopped, 1);

        assert!(!session.tick(now + 5.0));
        assert_eq!(session.observer().beats.len(), beats_before);
        assert_eq!(session.observer().ended, 0);

        // A second stop is a no-op
        session.stop();
        assert!(!session.is_playing());
        assert_eq!(session.observer().stopped, 1);
    }

    #[test]
    fn test_finish_does_not_report_stop() {
        let mut session = session(false);
        session.play(plan(&[(1, 120, "4/4")]), 0.0);
        run(&mut session, 0.1);
        assert_eq!(session.observer().ended, 1);
        assert_eq!(session.observer().stopped, 0);
    }

    #[test]
    fn test_stop_clears_mixer() {
        let mut mixer = CueMixer::new(1000);
        let mut session = PlaybackSession::new(&mut mixer, bank(), ()).with_options(SessionOptions {
            lead_in: true,
            start_delay: 0.0,
            short_sample_tempo: 160,
        });
        session.play(plan(&[(4, 120, "4/4"), (4, 120, "4/4")]), 0.0);
        session.tick(0.6);
        session.stop();
        drop(session);

        assert_eq!(mixer.pending_count(), 0);
        assert!(mixer.is_idle());
    }

    #[test]
    fn test_replay_restarts() {
        let mut session = session(false);
        session.play(plan(&[(4, 120, "4/4")]), 0.0);
        session.tick(1.1);
        assert_eq!(session.state().beat_within_block, 2);

        assert!(session.play(plan(&[(1, 120, "4/4")]), 2.0));
        assert!(session.is_playing());
        assert_eq!(session.state().beat_within_block, 0);
        assert_eq!(session.plan().total_beats(), 4);

        // Cues from the first play-through were cancelled
        let live = session.sink().live_cues().count();
        assert_eq!(live, 4);
    }

    #[test]
    fn test_slow_frames_do_not_skip_beats() {
        let mut session = session(false);
        session.play(plan(&[(2, 240, "4/4"), (2, 240, "4/4")]), 0.0);
        run(&mut session, 0.4);

        let song_beats: Vec<u64> = session.observer().beats.iter().map(|b| b.song_beat).collect();
        assert_eq!(song_beats, (0..16).collect::<Vec<_>>());
        assert_eq!(session.observer().blocks, vec![0, 1]);
    }

    #[test]
    fn test_block_change_state() {
        let mut session = session(false);
        session.play(plan(&[(1, 60, "4/4"), (1, 60, "4/4")]), 0.0);
        session.tick(4.5);
        let state = session.state();
        assert_eq!(state.current_block_index, 1);
        assert_eq!(state.beat_within_block, 0);
        assert_eq!(state.measure_within_block, 1);
        assert_eq!(state.elapsed_song_beats, 4);
        assert!((state.elapsed_song_seconds - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_song_time_at() {
        let mut session = session(true);
        session.play(plan(&[(2, 120, "4/4")]), 0.0);
        assert_eq!(session.song_time_at(1.0), 0.0);
        assert!((session.song_time_at(3.0) - 1.0).abs() < 1e-9);
        assert_eq!(session.song_time_at(100.0), 4.0);
    }

    #[test]
    fn test_frames_report_song_time_between_beats() {
        let mut session = session(true);
        session.play(plan(&[(2, 120, "4/4")]), 0.0);

        // Count in: no song position yet
        session.tick(1.0);
        assert!(session.observer().frames.is_empty());

        session.tick(2.2);
        session.tick(2.4);
        let frames = &session.observer().frames;
        assert_eq!(frames.len(), 2);
        assert!((frames[0] - 0.2).abs() < 1e-9);
        assert!((frames[1] - 0.4).abs() < 1e-9);
        // No beat fell in the second frame, so only the frame position moved
        assert!((session.state().elapsed_song_seconds - 0.2).abs() < 1e-9);
    }
}
