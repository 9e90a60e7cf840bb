// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Song timeline widget.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Paragraph, Widget},
};

use super::format::{abbreviate_key, format_duration, format_part, truncate_lyrics};
use crate::song::{Block as SongBlock, Song};
use crate::timing::{TimingPlan, TimingRecord};

/// Column widths shared by the header and the rows
const COLUMNS: [Constraint; 7] = [
    Constraint::Length(3),  // #
    Constraint::Length(12), // Part
    Constraint::Length(6),  // Meter
    Constraint::Length(5),  // Measures
    Constraint::Length(6),  // Key
    Constraint::Length(12), // Start - end
    Constraint::Min(10),    // Lyrics
];

/// Widget listing every block with the playing one highlighted
pub struct TimelineWidget<'a> {
    song: &'a Song,
    plan: &'a TimingPlan,
    current: Option<usize>,
    block: Option<Block<'a>>,
}

impl<'a> TimelineWidget<'a> {
    /// Create a new timeline widget
    pub fn new(song: &'a Song, plan: &'a TimingPlan) -> Self {
        Self {
            song,
            plan,
            current: None,
            block: None,
        }
    }

    /// Set the playing block
    pub fn current(mut self, index: Option<usize>) -> Self {
        self.current = index;
        self
    }

    /// Set the block wrapper
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for TimelineWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        if self.song.is_empty() {
            Paragraph::new("No blocks in song")
                .style(Style::default().fg(Color::DarkGray))
                .render(area, buf);
            return;
        }

        let rows = area.height as usize;
        if rows == 0 {
            return;
        }

        // Keep the playing block visible when the song is taller than the area
        let visible = rows - 1;
        let first = match self.current {
            Some(current) if visible > 0 && current >= visible => current + 1 - visible,
            _ => 0,
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                std::iter::once(Constraint::Length(1))
                    .chain((0..visible).map(|_| Constraint::Length(1)))
                    .collect::<Vec<_>>(),
            )
            .split(area);

        render_header(chunks[0], buf);

        let entries = self.song.blocks().iter().zip(self.plan.records()).enumerate();
        for (row, (index, (block, record))) in entries.skip(first).take(visible).enumerate() {
            let playing = self.current == Some(index);
            render_row(chunks[row + 1], buf, index, block, record, playing);
        }
    }
}

fn render_header(area: Rect, buf: &mut Buffer) {
    let style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(COLUMNS)
        .split(area);

    for (chunk, title) in chunks.iter().zip(["#", "Part", "Meter", "Bars", "Key", "Time", "Lyrics"]) {
        Paragraph::new(title).style(style).render(*chunk, buf);
    }
}

fn render_row(
    area: Rect,
    buf: &mut Buffer,
    index: usize,
    block: &SongBlock,
    record: &TimingRecord,
    playing: bool,
) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(COLUMNS)
        .split(area);

    let (marker, style) = if playing {
        (
            format!(">{}", index + 1),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )
    } else {
        (format!(" {}", index + 1), Style::default().fg(Color::White))
    };
    let dim = Style::default().fg(Color::DarkGray);

    Paragraph::new(marker).style(style).render(chunks[0], buf);
    Paragraph::new(format_part(block.kind()))
        .style(style)
        .render(chunks[1], buf);
    Paragraph::new(block.time_signature().to_string())
        .style(Style::default().fg(Color::Cyan))
        .render(chunks[2], buf);
    Paragraph::new(format!("{}m", block.measures()))
        .style(Style::default().fg(Color::Cyan))
        .render(chunks[3], buf);
    Paragraph::new(abbreviate_key(block.root_note(), block.mode()))
        .style(Style::default().fg(Color::Magenta))
        .render(chunks[4], buf);
    Paragraph::new(format!(
        "{}-{}",
        format_duration(record.start_time_offset),
        format_duration(record.end_time())
    ))
    .style(dim)
    .render(chunks[5], buf);
    Paragraph::new(truncate_lyrics(block.lyrics()))
        .style(dim)
        .render(chunks[6], buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    fn song(blocks: usize) -> Song {
        let mut song = Song::new("Timeline");
        for _ in 0..blocks {
            song.push_block(
                SongBlock::new("verse", 4, "D", "Dorian", 120, "4/4")
                    .unwrap()
                    .with_lyrics("Whispers of the past"),
            );
        }
        song
    }

    #[test]
    fn test_timeline_empty() {
        let song = Song::new("Empty");
        let plan = song.timing_plan();
        let area = Rect::new(0, 0, 40, 3);
        let mut buf = Buffer::empty(area);
        TimelineWidget::new(&song, &plan).render(area, &mut buf);
        assert!(row_text(&buf, 0).starts_with("No blocks in song"));
    }

    #[test]
    fn test_timeline_rows() {
        let song = song(2);
        let plan = song.timing_plan();
        let area = Rect::new(0, 0, 80, 3);
        let mut buf = Buffer::empty(area);
        TimelineWidget::new(&song, &plan)
            .current(Some(1))
            .render(area, &mut buf);

        assert!(row_text(&buf, 0).starts_with("#"));
        let first = row_text(&buf, 1);
        assert!(first.starts_with(" 1 Verse"));
        assert!(first.contains("0:00-0:08"));
        assert!(first.contains("Whispers of the past"));
        assert!(row_text(&buf, 2).starts_with(">2 Verse"));
    }

    #[test]
    fn test_timeline_scrolls_to_current() {
        let song = song(10);
        let plan = song.timing_plan();
        let area = Rect::new(0, 0, 80, 4);
        let mut buf = Buffer::empty(area);
        TimelineWidget::new(&song, &plan)
            .current(Some(7))
            .render(area, &mut buf);

        assert!(row_text(&buf, 1).starts_with(" 6 "));
        assert!(row_text(&buf, 3).starts_with(">8 "));
    }
}
