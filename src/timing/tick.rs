// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Frame tick sources.
//!
//! Playback is driven by a host frame loop. The loop is abstracted behind
//! [`TickSource`] so the same clock logic runs against a real tokio interval
//! or a scripted list of timestamps in tests.

use std::collections::VecDeque;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::{interval, Interval, MissedTickBehavior};

/// A source of frame timestamps in seconds
pub trait TickSource {
    /// Current time on the frame clock
    fn now(&self) -> f64;

    /// Wait for the next frame; `None` once the host stops producing frames
    fn next_tick(&mut self) -> impl Future<Output = Option<f64>> + Send;
}

/// Real-time frame loop backed by a tokio interval
#[derive(Debug)]
pub struct FrameTicker {
    interval: Interval,
    epoch: Instant,
}

impl FrameTicker {
    /// Create a ticker firing every `frame_interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(frame_interval: Duration) -> Self {
        let mut interval = interval(frame_interval.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            epoch: Instant::now(),
        }
    }

    /// Create a ticker at a frame rate in Hz
    pub fn with_frame_rate(frame_rate: u32) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / frame_rate.max(1) as f64))
    }
}

impl TickSource for FrameTicker {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    async fn next_tick(&mut self) -> Option<f64> {
        let instant = self.interval.tick().await;
        Some(
            instant
                .into_std()
                .saturating_duration_since(self.epoch)
                .as_secs_f64(),
        )
    }
}

/// Deterministic frame timestamps for tests and offline rendering
#[derive(Debug, Clone, Default)]
pub struct ScriptedTicks {
    ticks: VecDeque<f64>,
    now: f64,
}

impl ScriptedTicks {
    /// Ticks at explicit timestamps
    pub fn new(ticks: impl IntoIterator<Item = f64>) -> Self {
        let ticks: VecDeque<f64> = ticks.into_iter().collect();
        let now = ticks.front().copied().unwrap_or(0.0);
        Self { ticks, now }
    }

    /// `count` ticks spaced `interval` seconds apart starting at `start`
    pub fn uniform(start: f64, interval: f64, count: usize) -> Self {
        Self::new((0..count).map(|i| start + i as f64 * interval))
    }

    /// Number of ticks left
    pub fn remaining(&self) -> usize {
        self.ticks.len()
    }
}

impl TickSource for ScriptedTicks {
    fn now(&self) -> f64 {
        self.now
    }

    async fn next_tick(&mut self) -> Option<f64> {
        let tick = self.ticks.pop_front()?;
        self.now = tick;
        Some(tick)
    }
}
