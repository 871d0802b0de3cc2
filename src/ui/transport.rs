use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};

use stemoxide::transport::{MixerSnapshot, TransportState};

use crate::ui::Theme;

/// State, time labels and progress bar
pub fn render_transport(frame: &mut Frame, area: Rect, snapshot: &MixerSnapshot, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.bg));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let status_style = match snapshot.state {
        TransportState::Playing => Style::default().fg(theme.hot).bold(),
        TransportState::Paused => Style::default().fg(theme.warm).bold(),
        TransportState::Stopped => Style::default().fg(theme.dimmed),
    };
    let time_style = if snapshot.scrubbing {
        Style::default().fg(theme.highlight).bold()
    } else {
        Style::default().fg(theme.fg)
    };

    let mut spans = vec![
        Span::styled(format!(" {} ", snapshot.state.name()), status_style),
        Span::styled(" | ", Style::default().fg(theme.border)),
        Span::styled(snapshot.elapsed_label.clone(), time_style),
        Span::styled(" / -", Style::default().fg(theme.dimmed)),
        Span::styled(snapshot.remaining_label.clone(), time_style),
    ];
    if snapshot.scrubbing {
        spans.push(Span::styled(
            "  SCRUB (Enter to jump, Esc to cancel)",
            Style::default().fg(theme.highlight),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), rows[0]);

    let gauge_color = if snapshot.scrubbing {
        theme.highlight
    } else {
        theme.progress
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(gauge_color).bg(theme.fader_empty))
        .ratio(snapshot.progress())
        .label("");
    frame.render_widget(gauge, rows[1]);
}
