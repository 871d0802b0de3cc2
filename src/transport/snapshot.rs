use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::NUM_STEMS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    pub fn name(self) -> &'static str {
        match self {
            TransportState::Stopped => "STOP",
            TransportState::Playing => "PLAY",
            TransportState::Paused => "PAUSE",
        }
    }
}

/// Per-channel view for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub effective_volume: f32,
    pub user_volume: f32,
    pub muted: bool,
    /// Silenced because another channel is soloed
    pub soloed_out: bool,
}

impl Default for ChannelSnapshot {
    fn default() -> Self {
        Self {
            effective_volume: 1.0,
            user_volume: 1.0,
            muted: false,
            soloed_out: false,
        }
    }
}

/// Immutable state published at the end of every control-lane operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MixerSnapshot {
    pub loaded: bool,
    pub title: Option<String>,
    pub state: TransportState,
    pub position: f64,
    pub duration: f64,
    pub channels: [ChannelSnapshot; NUM_STEMS],
    pub soloed: Option<usize>,
    pub scrubbing: bool,
    /// Preview position while a scrub gesture is held
    pub scrub_position: Option<f64>,
    pub elapsed_label: String,
    pub remaining_label: String,
    pub fault: Option<String>,
    /// Number of lane operations executed so far
    pub revision: u64,
}

impl MixerSnapshot {
    pub fn empty(revision: u64) -> Self {
        Self {
            elapsed_label: format_time(0.0),
            remaining_label: format_time(0.0),
            revision,
            ..Default::default()
        }
    }

    /// Position to show: the scrub preview while scrubbing
    pub fn display_position(&self) -> f64 {
        self.scrub_position.unwrap_or(self.position)
    }

    pub fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        (self.display_position() / self.duration).clamp(0.0, 1.0)
    }
}

/// Whole-second "mm:ss"
pub fn format_time(secs: f64) -> String {
    let total = if secs.is_finite() { secs.max(0.0) as u64 } else { 0 };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Elapsed and remaining labels for a display position
pub fn time_labels(display_position: f64, duration: f64) -> (String, String) {
    let position = display_position.clamp(0.0, duration.max(0.0));
    (format_time(position), format_time(duration - position))
}

/// Single-writer cell the lane swaps a fresh snapshot into
#[derive(Clone)]
pub struct SnapshotCell {
    inner: Arc<RwLock<Arc<MixerSnapshot>>>,
}

impl SnapshotCell {
    pub fn new(initial: MixerSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    pub fn publish(&self, snapshot: MixerSnapshot) {
        *self.inner.write() = Arc::new(snapshot);
    }

    pub fn load(&self) -> Arc<MixerSnapshot> {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(59.9), "00:59");
        assert_eq!(format_time(61.0), "01:01");
        assert_eq!(format_time(-4.0), "00:00");
        assert_eq!(format_time(f64::NAN), "00:00");
    }

    #[test]
    fn remaining_is_duration_minus_position() {
        let (elapsed, remaining) = time_labels(30.0, 200.0);
        assert_eq!(elapsed, "00:30");
        assert_eq!(remaining, "02:50");
        let (_, remaining) = time_labels(500.0, 200.0);
        assert_eq!(remaining, "00:00");
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let cell = SnapshotCell::new(MixerSnapshot::empty(0));
        let before = cell.load();
        cell.publish(MixerSnapshot::empty(7));
        assert_eq!(before.revision, 0);
        assert_eq!(cell.load().revision, 7);
    }
}
