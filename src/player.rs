//! Public facade over the control lane.
//!
//! Every mutating call is queued onto a single "audio-control" thread and
//! returns immediately; presentation reads the latest [`MixerSnapshot`].
//! `load` is the exception: it decodes on the caller's thread and reports
//! failure before anything on the lane changes.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::bounded;
use parking_lot::RwLock;

use crate::audio::MixBus;
use crate::command::{
    Command, CommandBus, CommandReceiver, CommandSender, CommandSource, LaneMessage, LoadedSong,
};
use crate::error::AudioLoadError;
use crate::event::{Event, EventLog};
use crate::library::SongRecord;
use crate::transport::{
    EngineOptions, MixerEngine, MixerSnapshot, SnapshotCell, TickOutcome, Ticker,
    TransportPoller, DEFAULT_TICK_INTERVAL, NUM_STEMS,
};

#[derive(Debug, Clone)]
pub struct PlayerOptions {
    pub engine: EngineOptions,
    /// Transport poll period. `None` disables the background ticker; ticks
    /// must then be sent with [`StemPlayer::tick`].
    pub tick_interval: Option<Duration>,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            engine: EngineOptions::default(),
            tick_interval: Some(DEFAULT_TICK_INTERVAL),
        }
    }
}

pub struct StemPlayer {
    bus: Arc<MixBus>,
    options: EngineOptions,
    sender: CommandSender,
    snapshots: SnapshotCell,
    event_log: Arc<RwLock<EventLog>>,
    lane: Option<JoinHandle<()>>,
}

impl StemPlayer {
    /// Spawn the control lane for songs rendered through `bus`
    pub fn new(bus: Arc<MixBus>, options: PlayerOptions) -> std::io::Result<Self> {
        let commands = CommandBus::new();
        let sender = commands.sender();
        let snapshots = SnapshotCell::new(MixerSnapshot::empty(0));
        let event_log = Arc::new(RwLock::new(EventLog::new()));

        let session = Session {
            engine: None,
            title: None,
            poller: TransportPoller::new(options.tick_interval.unwrap_or(DEFAULT_TICK_INTERVAL)),
            tick_interval: options.tick_interval,
            ticker: None,
            sender: sender.clone(),
            snapshots: snapshots.clone(),
            event_log: event_log.clone(),
            revision: 0,
        };
        let receiver = commands.receiver();
        let lane = thread::Builder::new()
            .name("audio-control".into())
            .spawn(move || session.run(receiver))?;

        Ok(Self {
            bus,
            options: options.engine,
            sender,
            snapshots,
            event_log,
            lane: Some(lane),
        })
    }

    pub fn bus(&self) -> &Arc<MixBus> {
        &self.bus
    }

    // === Loading ===

    /// Decode four stems (vocals, other, drums, bass) and replace the current
    /// song. On error the current song is left untouched.
    pub fn load(
        &self,
        paths: &[PathBuf; NUM_STEMS],
        reference_duration: Option<f64>,
    ) -> Result<(), AudioLoadError> {
        self.load_with_title(paths, reference_duration, None)
    }

    pub fn load_song(&self, song: &SongRecord) -> Result<(), AudioLoadError> {
        self.load_with_title(&song.stems.as_array(), None, Some(song.title.clone()))
    }

    pub fn load_with_title(
        &self,
        paths: &[PathBuf; NUM_STEMS],
        reference_duration: Option<f64>,
        title: Option<String>,
    ) -> Result<(), AudioLoadError> {
        let engine = MixerEngine::load(self.bus.clone(), paths, reference_duration, &self.options)?;
        self.sender
            .post(LaneMessage::Install(Box::new(LoadedSong { engine, title })));
        Ok(())
    }

    // === Commands ===

    /// Queue a command. Returns false once the lane has shut down.
    pub fn send(&self, cmd: Command, source: CommandSource) -> bool {
        self.sender.send(cmd, source)
    }

    pub fn command_sender(&self) -> CommandSender {
        self.sender.clone()
    }

    pub fn play(&self) {
        self.send(Command::Play, CommandSource::Api);
    }

    pub fn pause(&self) {
        self.send(Command::Pause, CommandSource::Api);
    }

    pub fn seek(&self, secs: f64) {
        self.send(Command::Seek(secs), CommandSource::Api);
    }

    pub fn set_volume(&self, channel: usize, volume: f32) {
        self.send(Command::SetVolume { channel, volume }, CommandSource::Api);
    }

    pub fn toggle_mute(&self, channel: usize) {
        self.send(Command::ToggleMute(channel), CommandSource::Api);
    }

    pub fn begin_solo(&self, channel: usize) {
        self.send(Command::BeginSolo(channel), CommandSource::Api);
    }

    pub fn end_solo(&self, channel: usize) {
        self.send(Command::EndSolo(channel), CommandSource::Api);
    }

    pub fn begin_scrub(&self) {
        self.send(Command::BeginScrub, CommandSource::Api);
    }

    pub fn scrub_to(&self, secs: f64) {
        self.send(Command::ScrubTo(secs), CommandSource::Api);
    }

    pub fn end_scrub(&self, secs: f64) {
        self.send(Command::EndScrub(secs), CommandSource::Api);
    }

    pub fn cancel_scrub(&self) {
        self.send(Command::CancelScrub, CommandSource::Api);
    }

    pub fn unload(&self) {
        self.send(Command::Unload, CommandSource::Api);
    }

    /// Run one transport poll on the lane
    pub fn tick(&self) {
        self.send(Command::Tick, CommandSource::Api);
    }

    /// Block until everything queued so far has executed
    pub fn flush(&self) -> bool {
        let (ack_tx, ack_rx) = bounded(1);
        if !self.sender.post(LaneMessage::Flush(ack_tx)) {
            return false;
        }
        ack_rx.recv().is_ok()
    }

    // === Reads ===

    pub fn snapshot(&self) -> Arc<MixerSnapshot> {
        self.snapshots.load()
    }

    /// Executed commands with an event id greater than `id`
    pub fn events_since(&self, id: u64) -> Vec<Event> {
        self.event_log.read().since(id)
    }

    pub fn event_log(&self) -> Arc<RwLock<EventLog>> {
        self.event_log.clone()
    }
}

impl Drop for StemPlayer {
    fn drop(&mut self) {
        self.sender.post(LaneMessage::Shutdown);
        if let Some(lane) = self.lane.take() {
            let _ = lane.join();
        }
    }
}

/// State owned by the control lane thread
struct Session {
    engine: Option<MixerEngine>,
    title: Option<String>,
    poller: TransportPoller,
    tick_interval: Option<Duration>,
    ticker: Option<Ticker>,
    sender: CommandSender,
    snapshots: SnapshotCell,
    event_log: Arc<RwLock<EventLog>>,
    revision: u64,
}

impl Session {
    fn run(mut self, receiver: CommandReceiver) {
        log::debug!("Control lane started");
        while let Some(msg) = receiver.recv() {
            match msg {
                LaneMessage::Command(cmd, source) => self.execute(cmd, source),
                LaneMessage::Install(song) => self.install(*song),
                LaneMessage::Flush(ack) => {
                    let _ = ack.send(());
                    continue;
                }
                LaneMessage::Shutdown => break,
            }
            self.publish();
        }
        self.stop_ticker();
        self.engine = None;
        log::debug!("Control lane stopped");
    }

    fn install(&mut self, song: LoadedSong) {
        let LoadedSong { mut engine, title } = song;
        // Old voices leave the bus before the new ones join
        self.engine = None;
        if let Some(stale) = engine.bus().take_fault() {
            log::debug!("Discarding fault from previous song: {}", stale);
        }
        engine.attach();
        log::info!(
            "Song loaded: {} ({:.2}s)",
            title.as_deref().unwrap_or("untitled"),
            engine.duration()
        );
        self.engine = Some(engine);
        self.title = title;
        self.start_ticker();
    }

    fn start_ticker(&mut self) {
        let Some(interval) = self.tick_interval else {
            return;
        };
        if self.ticker.is_some() {
            return;
        }
        match Ticker::start(interval, self.sender.clone()) {
            Ok(ticker) => self.ticker = Some(ticker),
            Err(e) => log::error!("Failed to start transport ticker: {}", e),
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    fn execute(&mut self, cmd: Command, source: CommandSource) {
        if cmd.is_loggable() {
            log::debug!("{} ({:?})", cmd.description(), source);
        }

        if cmd == Command::Unload {
            self.stop_ticker();
            if self.engine.take().is_some() {
                log::info!("Song unloaded");
            }
            self.title = None;
            self.event_log.write().record(&cmd, source);
            return;
        }

        let Some(engine) = self.engine.as_mut() else {
            if cmd != Command::Tick {
                log::warn!("{} ignored: no song loaded", cmd.description());
            }
            return;
        };

        match cmd {
            Command::Play => engine.play(),
            Command::Pause => engine.pause(),
            Command::Seek(secs) => engine.seek(secs),
            Command::SetVolume { channel, volume } => engine.set_volume(channel, volume),
            Command::ToggleMute(channel) => engine.toggle_mute(channel),
            Command::BeginSolo(channel) => engine.begin_solo(channel),
            Command::EndSolo(channel) => engine.end_solo(channel),
            Command::BeginScrub => engine.begin_scrub(),
            Command::ScrubTo(secs) => engine.scrub_to(secs),
            Command::EndScrub(secs) => engine.end_scrub(secs),
            Command::CancelScrub => engine.cancel_scrub(),
            Command::Tick => {
                if let TickOutcome::Ended = self.poller.tick(engine) {
                    log::debug!("Transport stopped at end of track");
                }
            }
            Command::Unload => {}
        }

        self.event_log.write().record(&cmd, source);
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot = match &self.engine {
            Some(engine) => engine.snapshot(self.title.clone(), self.revision),
            None => MixerSnapshot::empty(self.revision),
        };
        self.snapshots.publish(snapshot);
    }
}
