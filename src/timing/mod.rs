// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing engine.
//!
//! This module provides:
//! - Meter: time signature to beats-per-measure
//! - Block timing and the cumulative timing plan
//! - The polled beat clock
//! - Frame/audio clock reconciliation and frame tick sources

pub mod clock;
pub mod meter;
pub mod plan;
pub mod sync;
pub mod tick;

pub use clock::{BeatClock, ClockBeat, ClockState};
pub use meter::{beats_per_measure, MeterError, TimeSignature};
pub use plan::{BlockTiming, TimingPlan, TimingRecord};
pub use sync::ClockSync;
pub use tick::{FrameTicker, ScriptedTicks, TickSource};
