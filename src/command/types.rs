use serde::{Deserialize, Serialize};

use crate::transport::STEM_NAMES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandSource {
    /// Terminal front-end
    Tui,
    /// Transport ticker
    Ticker,
    /// Library callers (`StemPlayer` API)
    Api,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    // Transport
    Play,
    Pause,
    Seek(f64),

    // Mixer
    SetVolume { channel: usize, volume: f32 },
    ToggleMute(usize),
    BeginSolo(usize),
    EndSolo(usize),

    // Scrub gesture
    BeginScrub,
    ScrubTo(f64),
    EndScrub(f64),
    CancelScrub,

    // Song lifecycle
    Unload,

    // Transport poll
    Tick,
}

impl Command {
    /// Returns true if this command should be logged to event log
    pub fn is_loggable(&self) -> bool {
        !matches!(self, Command::Tick | Command::ScrubTo(_))
    }

    /// Human-readable description of the command
    pub fn description(&self) -> String {
        match self {
            Command::Play => "Play".to_string(),
            Command::Pause => "Pause".to_string(),
            Command::Seek(secs) => format!("Seek to {:.2}s", secs),
            Command::SetVolume { channel, volume } => {
                format!("Set {} volume to {:.2}", stem_name(*channel), volume)
            }
            Command::ToggleMute(channel) => format!("Toggle mute {}", stem_name(*channel)),
            Command::BeginSolo(channel) => format!("Solo {}", stem_name(*channel)),
            Command::EndSolo(channel) => format!("Release solo {}", stem_name(*channel)),
            Command::BeginScrub => "Begin scrub".to_string(),
            Command::ScrubTo(secs) => format!("Scrub to {:.2}s", secs),
            Command::EndScrub(secs) => format!("End scrub at {:.2}s", secs),
            Command::CancelScrub => "Cancel scrub".to_string(),
            Command::Unload => "Unload song".to_string(),
            Command::Tick => "Tick".to_string(),
        }
    }
}

fn stem_name(channel: usize) -> String {
    STEM_NAMES
        .get(channel)
        .map(|n| n.to_string())
        .unwrap_or_else(|| format!("channel {}", channel))
}
