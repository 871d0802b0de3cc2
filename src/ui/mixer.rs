use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use stemoxide::fader::{position_to_volume, volume_to_position};
use stemoxide::transport::{MixerSnapshot, NUM_STEMS, STEM_NAMES};

use crate::ui::Theme;

/// Selection and geometry of the four-fader mixer
pub struct MixerView {
    pub selected: usize,
    /// Rows in the fader track as last drawn
    fader_rows: u16,
}

impl MixerView {
    pub fn new() -> Self {
        Self {
            selected: 0,
            fader_rows: 10,
        }
    }

    pub fn select(&mut self, channel: usize) {
        if channel < NUM_STEMS {
            self.selected = channel;
        }
    }

    /// Lowest handle row (the bottom of the track, silence)
    fn track_max(&self) -> f32 {
        self.fader_rows.saturating_sub(1) as f32
    }

    /// Handle row for a gain; row 0 is the top of the track
    pub fn handle_row(&self, volume: f32) -> u16 {
        volume_to_position(volume, 0.0, self.track_max()).round() as u16
    }

    /// Gain after moving the handle `rows` rows (negative is up, louder)
    pub fn nudge(&self, volume: f32, rows: i32) -> f32 {
        let row = self.handle_row(volume) as f32 + rows as f32;
        position_to_volume(row, 0.0, self.track_max())
    }
}

impl Default for MixerView {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the four stem faders with mute and solo rows
pub fn render_mixer(
    frame: &mut Frame,
    area: Rect,
    snapshot: &MixerSnapshot,
    view: &mut MixerView,
    theme: &Theme,
) {
    let block = Block::default()
        .title(Span::styled(" Stems ", Style::default().fg(theme.fg)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.bg));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Stem names
            Constraint::Min(3),    // Faders
            Constraint::Length(1), // Volume values
            Constraint::Length(1), // Mute
            Constraint::Length(1), // Solo
        ])
        .split(inner);

    let col_width = (inner.width / NUM_STEMS as u16).max(8);
    view.fader_rows = chunks[1].height.max(2);

    render_headers(frame, chunks[0], view, col_width, theme);
    render_faders(frame, chunks[1], snapshot, view, col_width, theme);

    for (channel, strip) in snapshot.channels.iter().enumerate() {
        let style = if channel == view.selected {
            Style::default().fg(theme.highlight).bold()
        } else {
            Style::default().fg(theme.fg)
        };
        cell(frame, chunks[2], channel, col_width, format!("{:.2}", strip.user_volume), style);
    }

    for (channel, strip) in snapshot.channels.iter().enumerate() {
        let (text, style) = if strip.muted {
            ("[M]", Style::default().fg(theme.alert).bold())
        } else {
            ("[ ]", Style::default().fg(theme.dimmed))
        };
        cell(frame, chunks[3], channel, col_width, text.to_string(), style);
    }

    for channel in 0..NUM_STEMS {
        let (text, style) = match snapshot.soloed {
            Some(solo) if solo == channel => ("[S]", Style::default().fg(theme.hot).bold()),
            _ => ("[ ]", Style::default().fg(theme.dimmed)),
        };
        cell(frame, chunks[4], channel, col_width, text.to_string(), style);
    }
}

fn cell(frame: &mut Frame, row: Rect, channel: usize, col_width: u16, text: String, style: Style) {
    let x = row.x + channel as u16 * col_width;
    if x >= row.x + row.width {
        return;
    }
    let width = col_width.min(row.x + row.width - x);
    let display = format!("{:^width$}", text, width = width as usize);
    frame.render_widget(
        Paragraph::new(display).style(style),
        Rect::new(x, row.y, width, 1),
    );
}

fn render_headers(frame: &mut Frame, area: Rect, view: &MixerView, col_width: u16, theme: &Theme) {
    for (channel, name) in STEM_NAMES.iter().enumerate() {
        let style = if channel == view.selected {
            Style::default().fg(theme.bg).bg(theme.highlight).bold()
        } else {
            Style::default().fg(theme.stem(channel))
        };
        cell(frame, area, channel, col_width, format!("{} {}", channel + 1, name), style);
    }
}

fn render_faders(
    frame: &mut Frame,
    area: Rect,
    snapshot: &MixerSnapshot,
    view: &MixerView,
    col_width: u16,
    theme: &Theme,
) {
    let rows = area.height;
    if rows == 0 {
        return;
    }

    for (channel, strip) in snapshot.channels.iter().enumerate() {
        let x = area.x + channel as u16 * col_width;
        if x >= area.x + area.width {
            break;
        }

        let handle = view.handle_row(strip.user_volume);
        let audible = !strip.muted && !strip.soloed_out;
        let bar_width = col_width.saturating_sub(2).clamp(2, 4);
        let bar_x = x + (col_width - bar_width) / 2;

        for row in 0..rows {
            let y = area.y + row;
            let (glyph, style) = if row == handle {
                let fg = if channel == view.selected {
                    theme.highlight
                } else {
                    theme.handle
                };
                ("\u{2580}", Style::default().fg(fg).bg(theme.bg).bold())
            } else if row > handle {
                let fg = if !audible {
                    theme.dimmed
                } else {
                    // Rows near the top of the filled region read hotter
                    let level = 1.0 - row as f32 / rows as f32;
                    if level > 0.85 {
                        theme.hot
                    } else if level > 0.6 {
                        theme.warm
                    } else {
                        theme.stem(channel)
                    }
                };
                ("\u{2588}", Style::default().fg(fg).bg(theme.bg))
            } else {
                ("\u{2591}", Style::default().fg(theme.fader_empty).bg(theme.bg))
            };

            frame.render_widget(
                Paragraph::new(glyph.repeat(bar_width as usize)).style(style),
                Rect::new(bar_x, y, bar_width, 1),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_volume_sits_on_the_top_row() {
        let view = MixerView::new();
        assert_eq!(view.handle_row(1.0), 0);
        assert_eq!(view.handle_row(0.0), 9);
    }

    #[test]
    fn nudge_moves_one_row_and_clamps() {
        let view = MixerView::new();
        let down = view.nudge(1.0, 1);
        assert!((down - (1.0 - 1.0 / 9.0)).abs() < 1e-4);
        assert_eq!(view.handle_row(down), 1);
        assert_eq!(view.nudge(1.0, -1), 1.0);
        assert_eq!(view.nudge(0.0, 3), 0.0);
    }

    #[test]
    fn select_ignores_out_of_range() {
        let mut view = MixerView::new();
        view.select(3);
        view.select(7);
        assert_eq!(view.selected, 3);
    }
}
