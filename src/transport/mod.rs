pub mod channel;
pub mod clock;
pub mod mixer;
pub mod poller;
pub mod snapshot;

/// Stems per song: vocals, other, drums, bass
pub const NUM_STEMS: usize = 4;

/// Display names in channel order
pub const STEM_NAMES: [&str; NUM_STEMS] = ["VOCALS", "OTHER", "DRUMS", "BASS"];

pub use channel::TrackChannel;
pub use clock::{PlaybackClock, DEFAULT_START_LEAD};
pub use mixer::{EngineOptions, MixerEngine, REFERENCE_CHANNEL};
pub use poller::{TickOutcome, Ticker, TransportPoller, DEFAULT_TICK_INTERVAL};
pub use snapshot::{
    format_time, time_labels, ChannelSnapshot, MixerSnapshot, SnapshotCell, TransportState,
};
