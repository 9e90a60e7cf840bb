// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Frame loop driver.

use std::future::Future;

use tracing::debug;

use super::{PlaybackObserver, PlaybackSession};
use crate::audio::CueSink;
use crate::timing::{TickSource, TimingPlan};

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The last block finished
    Finished,
    /// The cancellation future resolved; the session was stopped
    Cancelled,
    /// The tick source ran dry; the session was stopped
    TicksExhausted,
    /// The plan had no blocks; nothing was played
    NothingToPlay,
}

/// Poll a started session on every frame until it ends.
///
/// Cancellation takes priority over a frame that is ready at the same time.
pub async fn run_session<S, O, T, C>(
    session: &mut PlaybackSession<S, O>,
    ticks: &mut T,
    cancel: C,
) -> RunOutcome
where
    S: CueSink,
    O: PlaybackObserver,
    T: TickSource,
    C: Future<Output = ()>,
{
    if !session.is_playing() {
        return RunOutcome::Finished;
    }

    tokio::pin!(cancel);
    loop {
        tokio::select! {
            biased;
            _ = &mut cancel => {
                debug!("playback cancelled");
                session.stop();
                return RunOutcome::Cancelled;
            }
            tick = ticks.next_tick() => match tick {
                Some(now) => {
                    if !session.tick(now) {
                        return RunOutcome::Finished;
                    }
                }
                None => {
                    debug!("tick source exhausted");
                    session.stop();
                    return RunOutcome::TicksExhausted;
                }
            },
        }
    }
}

/// Start `plan` at the tick source's current time and run it to the end
pub async fn play_and_run<S, O, T, C>(
    session: &mut PlaybackSession<S, O>,
    plan: TimingPlan,
    ticks: &mut T,
    cancel: C,
) -> RunOutcome
where
    S: CueSink,
    O: PlaybackObserver,
    T: TickSource,
    C: Future<Output = ()>,
{
    if !session.play(plan, ticks.now()) {
        return RunOutcome::NothingToPlay;
    }
    run_session(session, ticks, cancel).await
}
