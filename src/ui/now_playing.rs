// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Current block display widget.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Paragraph, Widget},
};

use super::format::{block_details, block_title, status_line};
use crate::playback::PlaybackState;
use crate::song::Song;
use crate::timing::TimingPlan;

/// Widget showing the block being played and the song position
pub struct NowPlayingWidget<'a> {
    song: &'a Song,
    plan: &'a TimingPlan,
    state: &'a PlaybackState,
    block: Option<Block<'a>>,
}

impl<'a> NowPlayingWidget<'a> {
    /// Create a new now-playing widget
    pub fn new(song: &'a Song, plan: &'a TimingPlan, state: &'a PlaybackState) -> Self {
        Self {
            song,
            plan,
            state,
            block: None,
        }
    }

    /// Set the block wrapper
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Headline and detail lines for the current position
    pub fn lines(&self) -> (String, String) {
        if !self.state.is_playing {
            let title = format!("■ {}", self.song.name());
            return (title, "Stopped".to_string());
        }

        if self.state.in_lead_in {
            let beats = self.plan.record(0).map_or(0, |r| r.beats_per_measure);
            return (
                "Lead-In".to_string(),
                format!("Beat: {} of {}", self.state.beat_within_block + 1, beats),
            );
        }

        let index = self.state.current_block_index;
        match (self.song.block(index), self.plan.record(index)) {
            (Some(block), Some(record)) => (
                format!("{}  {}", block_title(block), block_details(block)),
                format!(
                    "Beat: {} of {} | Measure: {} of {} | Block: {} of {}",
                    self.state.beat_within_block + 1,
                    record.total_beats,
                    self.state.measure_within_block,
                    record.measures,
                    index + 1,
                    self.plan.len()
                ),
            ),
            _ => (String::new(), String::new()),
        }
    }
}

impl Widget for NowPlayingWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (title, info) = self.lines();
        let status = status_line(self.state, self.plan);

        let area = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Block label
                Constraint::Length(1), // Beat/measure
                Constraint::Length(1), // Song position
                Constraint::Min(0),
            ])
            .split(area);

        let title_style = if self.state.in_lead_in {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else if self.state.is_playing {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Yellow)
        };

        Paragraph::new(title).style(title_style).render(chunks[0], buf);
        Paragraph::new(info)
            .style(Style::default().fg(Color::Cyan))
            .render(chunks[1], buf);
        Paragraph::new(status)
            .style(Style::default().fg(Color::White))
            .render(chunks[2], buf);
    }
}
