// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Terminal UI for the song player.
//!
//! Provides a ratatui-based display of the block being played, the song
//! position, and a timeline of every block. The [`Player`] redraws from
//! playback notifications, so it is driven by the session rather than by
//! its own frame loop.

mod format;
mod now_playing;
mod timeline;

pub use format::{
    abbreviate_key, block_details, block_title, format_duration, format_part, status_line,
    truncate_lyrics,
};
pub use now_playing::NowPlayingWidget;
pub use timeline::TimelineWidget;

use std::future::Future;
use std::io::{self, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Span,
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::playback::{BeatEvent, PlaybackObserver, PlaybackState};
use crate::song::Song;
use crate::timing::TimingPlan;

/// How long a status message stays on screen
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Everything the player draws
#[derive(Debug, Clone)]
pub struct UiState {
    /// Song being played
    pub song: Song,
    /// Timing of the song's blocks
    pub plan: TimingPlan,
    /// Mirror of the session's position
    pub playback: PlaybackState,
    /// Status message
    pub status_message: Option<String>,
    /// Status message timestamp
    pub status_time: Option<Instant>,
}

impl UiState {
    /// Create display state for a song
    pub fn new(song: Song, plan: TimingPlan) -> Self {
        Self {
            song,
            plan,
            playback: PlaybackState::default(),
            status_message: None,
            status_time: None,
        }
    }

    /// Set a status message that will be displayed temporarily
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_time = Some(Instant::now());
    }

    /// Clear expired status message
    pub fn clear_expired_status(&mut self) {
        if let Some(time) = self.status_time {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
                self.status_time = None;
            }
        }
    }

    /// Block highlighted in the timeline
    pub fn current_block(&self) -> Option<usize> {
        let playback = &self.playback;
        (playback.is_playing && !playback.in_lead_in).then_some(playback.current_block_index)
    }
}

/// Key event result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// No action needed
    None,
    /// Stop playback
    Stop,
    /// Quit the application
    Quit,
}

impl KeyAction {
    /// Check if the action ends playback
    pub fn ends_playback(self) -> bool {
        self != KeyAction::None
    }
}

/// Map a key press to a player action
pub fn handle_key(code: KeyCode, modifiers: KeyModifiers) -> KeyAction {
    match (code, modifiers) {
        (KeyCode::Char('q'), KeyModifiers::NONE)
        | (KeyCode::Char('c'), KeyModifiers::CONTROL) => KeyAction::Quit,
        (KeyCode::Char(' '), KeyModifiers::NONE) | (KeyCode::Esc, KeyModifiers::NONE) => {
            KeyAction::Stop
        }
        _ => KeyAction::None,
    }
}

/// Background keyboard reader that resolves once a stop key is pressed.
///
/// The terminal must already be in raw mode for single key presses to
/// arrive without a newline.
pub struct StopKeys {
    receiver: Option<oneshot::Receiver<KeyAction>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StopKeys {
    /// Start reading keys, checking for shutdown every `poll_interval`
    pub fn spawn(poll_interval: Duration) -> Self {
        let (sender, receiver) = oneshot::channel();
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::spawn(move || {
            while flag.load(Ordering::Relaxed) {
                match next_action(poll_interval) {
                    Ok(action) if action.ends_playback() => {
                        debug!(?action, "stop key pressed");
                        let _ = sender.send(action);
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "keyboard input failed");
                        let _ = sender.send(KeyAction::Quit);
                        return;
                    }
                }
            }
        });

        Self {
            receiver: Some(receiver),
            running,
            handle: Some(handle),
        }
    }

    /// Future that completes when a stop key is pressed.
    ///
    /// Resolves with `None` when the reader has already been consumed.
    pub fn pressed(&mut self) -> impl Future<Output = Option<KeyAction>> + '_ {
        let receiver = self.receiver.take();
        async move {
            match receiver {
                Some(receiver) => receiver.await.ok(),
                None => None,
            }
        }
    }
}

impl Drop for StopKeys {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn next_action(timeout: Duration) -> io::Result<KeyAction> {
    if !event::poll(timeout)? {
        return Ok(KeyAction::None);
    }
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(handle_key(key.code, key.modifiers)),
        _ => Ok(KeyAction::None),
    }
}

/// Terminal song player display
pub struct Player<B: Backend = CrosstermBackend<Stdout>> {
    state: UiState,
    terminal: Terminal<B>,
    owns_terminal: bool,
}

impl Player {
    /// Take over the terminal and show `song`
    pub fn new(song: Song, plan: TimingPlan) -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            state: UiState::new(song, plan),
            terminal,
            owns_terminal: true,
        })
    }
}

impl<B: Backend> Player<B> {
    /// Draw onto an existing backend without touching terminal modes
    pub fn with_backend(backend: B, song: Song, plan: TimingPlan) -> io::Result<Self> {
        Ok(Self {
            state: UiState::new(song, plan),
            terminal: Terminal::new(backend)?,
            owns_terminal: false,
        })
    }

    /// Display state
    pub fn state(&self) -> &UiState {
        &self.state
    }

    /// Mutable display state
    pub fn state_mut(&mut self) -> &mut UiState {
        &mut self.state
    }

    /// Backend being drawn to
    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }

    /// Draw the UI
    pub fn draw(&mut self) -> io::Result<()> {
        self.state.clear_expired_status();
        let state = &self.state;
        self.terminal.draw(|frame| render(frame, state))?;
        Ok(())
    }

    fn redraw(&mut self) {
        if let Err(e) = self.draw() {
            warn!(error = %e, "failed to draw player");
        }
    }
}

impl<B: Backend> Player<B> {
    fn cleanup(&mut self) -> io::Result<()> {
        if !self.owns_terminal {
            return Ok(());
        }
        disable_raw_mode()?;
        // Only the crossterm backend is ever created with owns_terminal set
        execute!(io::stdout(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl<B: Backend> Drop for Player<B> {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

impl<B: Backend> PlaybackObserver for Player<B> {
    fn on_beat(&mut self, event: &BeatEvent) {
        self.state.playback.apply(event);
        self.redraw();
    }

    fn on_block_change(&mut self, block_index: usize) {
        let playback = &mut self.state.playback;
        playback.is_playing = true;
        playback.in_lead_in = false;
        playback.current_block_index = block_index;
        playback.beat_within_block = 0;
        playback.measure_within_block = 0;
        self.redraw();
    }

    fn on_frame(&mut self, song_time: f64) {
        let playback = &mut self.state.playback;
        if !playback.is_playing || playback.in_lead_in {
            return;
        }
        // The clock only reads whole seconds
        let shown = playback.elapsed_song_seconds.floor();
        playback.elapsed_song_seconds = song_time.max(playback.elapsed_song_seconds);
        if playback.elapsed_song_seconds.floor() != shown {
            self.redraw();
        }
    }

    fn on_playback_end(&mut self) {
        self.state.playback.reset();
        self.state.set_status("Finished");
        self.redraw();
    }

    fn on_stop(&mut self) {
        self.state.playback.reset();
        self.state.set_status("Stopped");
        self.redraw();
    }
}

/// Lay out the full player screen
fn render(frame: &mut Frame, state: &UiState) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Now playing
            Constraint::Min(4),    // Timeline
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let now_playing = NowPlayingWidget::new(&state.song, &state.plan, &state.playback)
        .block(Block::default().borders(Borders::ALL).title(" Now Playing "));
    frame.render_widget(now_playing, chunks[0]);

    let timeline = TimelineWidget::new(&state.song, &state.plan)
        .current(state.current_block())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", state.song.name())),
        );
    frame.render_widget(timeline, chunks[1]);

    render_status_bar(frame, chunks[2], state);
}

fn render_status_bar(frame: &mut Frame, area: Rect, state: &UiState) {
    let text = if let Some(ref msg) = state.status_message {
        Span::styled(msg, Style::default().fg(Color::Yellow))
    } else {
        Span::styled(
            " Space/Esc: Stop | q/Ctrl+c: Quit",
            Style::default().fg(Color::DarkGray),
        )
    };

    frame.render_widget(Paragraph::new(text), area);
}
