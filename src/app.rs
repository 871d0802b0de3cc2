use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;

use stemoxide::audio::AudioEngine;
use stemoxide::command::{Command, CommandSource};
use stemoxide::transport::{format_time, MixerSnapshot, TransportState};
use stemoxide::StemPlayer;

use crate::ui::{render_mixer, render_transport, MixerView, Theme};

/// Seek and scrub step for the arrow and bracket keys
const JUMP_SECS: f64 = 5.0;

/// Main application state
pub struct App {
    // The lane detaches its voices before the output stream closes
    player: StemPlayer,
    _engine: AudioEngine,
    theme: Theme,
    mixer: MixerView,
    /// Target of the scrub gesture in progress
    scrub: Option<f64>,
    status_message: Option<(String, Instant)>,
    should_quit: bool,
}

impl App {
    pub fn new(player: StemPlayer, engine: AudioEngine, theme: Theme) -> Self {
        Self {
            player,
            _engine: engine,
            theme,
            mixer: MixerView::new(),
            scrub: None,
            status_message: None,
            should_quit: false,
        }
    }

    /// Run the main application loop
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = Self::setup_terminal()?;
        let result = self.main_loop(&mut terminal);
        Self::restore_terminal(&mut terminal)?;
        result
    }

    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(terminal)
    }

    fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        Ok(())
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            let snapshot = self.player.snapshot();
            terminal.draw(|frame| self.render(frame, &snapshot))?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key, &snapshot);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }
        Ok(())
    }

    fn dispatch(&self, cmd: Command) {
        self.player.send(cmd, CommandSource::Tui);
    }

    fn set_status(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    fn handle_key(&mut self, key: KeyEvent, snapshot: &MixerSnapshot) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        let channel = self.mixer.selected;
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char(' ') => {
                if snapshot.state == TransportState::Playing {
                    self.dispatch(Command::Pause);
                } else {
                    self.dispatch(Command::Play);
                }
            }
            KeyCode::Char(c @ '1'..='4') => {
                self.mixer.select(c as usize - '1' as usize);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                let volume = self.mixer.nudge(snapshot.channels[channel].user_volume, -1);
                self.dispatch(Command::SetVolume { channel, volume });
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let volume = self.mixer.nudge(snapshot.channels[channel].user_volume, 1);
                self.dispatch(Command::SetVolume { channel, volume });
            }
            KeyCode::Char('m') => self.dispatch(Command::ToggleMute(channel)),
            KeyCode::Char('s') => {
                // Latched: the second press releases the held solo
                if snapshot.soloed == Some(channel) {
                    self.dispatch(Command::EndSolo(channel));
                } else {
                    self.dispatch(Command::BeginSolo(channel));
                }
            }
            KeyCode::Char(',') | KeyCode::Char('<') => self.scrub_by(-JUMP_SECS, snapshot),
            KeyCode::Char('.') | KeyCode::Char('>') => self.scrub_by(JUMP_SECS, snapshot),
            KeyCode::Enter => {
                if let Some(target) = self.scrub.take() {
                    self.dispatch(Command::EndScrub(target));
                    self.set_status(format!("Jumped to {}", format_time(target)));
                }
            }
            KeyCode::Esc => {
                if self.scrub.take().is_some() {
                    self.dispatch(Command::CancelScrub);
                }
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.dispatch(Command::Seek(snapshot.position - JUMP_SECS));
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.dispatch(Command::Seek(snapshot.position + JUMP_SECS));
            }
            _ => {}
        }
    }

    fn scrub_by(&mut self, delta: f64, snapshot: &MixerSnapshot) {
        if !snapshot.loaded {
            return;
        }
        let from = match self.scrub {
            Some(target) => target,
            None => {
                self.dispatch(Command::BeginScrub);
                snapshot.position
            }
        };
        let target = (from + delta).clamp(0.0, snapshot.duration);
        self.scrub = Some(target);
        self.dispatch(Command::ScrubTo(target));
    }

    fn render(&mut self, frame: &mut Frame, snapshot: &Arc<MixerSnapshot>) {
        let area = frame.area();

        let bg_block = Block::default().style(Style::default().bg(self.theme.bg));
        frame.render_widget(bg_block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(4), // Transport
                Constraint::Min(8),    // Mixer
                Constraint::Length(3), // Footer
            ])
            .split(area);

        self.render_header(frame, chunks[0], snapshot);
        render_transport(frame, chunks[1], snapshot, &self.theme);
        render_mixer(frame, chunks[2], snapshot, &mut self.mixer, &self.theme);
        self.render_footer(frame, chunks[3], snapshot);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, snapshot: &MixerSnapshot) {
        let song = snapshot.title.as_deref().unwrap_or("untitled");
        let title = format!(" STEMOXIDE v{} | {} ", env!("CARGO_PKG_VERSION"), song);
        let header = Paragraph::new(title)
            .style(
                Style::default()
                    .fg(self.theme.highlight)
                    .bg(self.theme.bg)
                    .bold(),
            )
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.border))
                    .style(Style::default().bg(self.theme.bg)),
            );
        frame.render_widget(header, area);
    }

    /// Fault, recent status message, or key help
    fn render_footer(&self, frame: &mut Frame, area: Rect, snapshot: &MixerSnapshot) {
        let (text, color) = if let Some(fault) = &snapshot.fault {
            (format!("Playback stopped: {}", fault), self.theme.alert)
        } else {
            match &self.status_message {
                Some((msg, instant)) if instant.elapsed().as_secs() < 3 => {
                    (msg.clone(), self.theme.fg)
                }
                _ => (footer_help().to_string(), self.theme.dimmed),
            }
        };

        let footer = Paragraph::new(text)
            .style(Style::default().fg(color).bg(self.theme.bg))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.border))
                    .style(Style::default().bg(self.theme.bg)),
            );
        frame.render_widget(footer, area);
    }
}

fn footer_help() -> &'static str {
    "SPACE play/pause | 1-4 stem | \u{2191}\u{2193} fader | m mute | s solo | \u{2190}\u{2192} seek | ,/. scrub | q quit"
}
