use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};

use crate::command::{Command, CommandSender, CommandSource};

use super::mixer::MixerEngine;
use super::snapshot::TransportState;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// What a single poll observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing; nothing to sample
    Idle,
    /// A scrub gesture is held
    Suppressed,
    Sampled,
    /// Reference channel ran out; transport stopped
    Ended,
    Faulted(String),
}

/// Samples the reference channel and detects end of track
pub struct TransportPoller {
    interval: Duration,
}

impl TransportPoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn tick(&self, engine: &mut MixerEngine) -> TickOutcome {
        if let Some(fault) = engine.bus().take_fault() {
            engine.report_fault(fault.clone());
            return TickOutcome::Faulted(fault);
        }

        if engine.is_scrubbing() {
            return TickOutcome::Suppressed;
        }

        if engine.state() != TransportState::Playing {
            return TickOutcome::Idle;
        }

        let position = engine.refresh_position();
        if engine.reference_is_playing() {
            return TickOutcome::Sampled;
        }

        if engine.duration() - position <= self.interval.as_secs_f64() {
            engine.finish();
            TickOutcome::Ended
        } else {
            let fault = format!(
                "Reference channel stopped unexpectedly at {:.2}s",
                position
            );
            engine.report_fault(fault.clone());
            TickOutcome::Faulted(fault)
        }
    }
}

impl Default for TransportPoller {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

/// Background thread posting `Command::Tick` onto the control lane.
///
/// Stops and joins on drop.
pub struct Ticker {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn start(interval: Duration, sender: CommandSender) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let handle = thread::Builder::new()
            .name("transport-ticker".into())
            .spawn(move || {
                let ticks = tick(interval);
                loop {
                    select! {
                        recv(ticks) -> _ => {
                            if !sender.send(Command::Tick, CommandSource::Ticker) {
                                break;
                            }
                        }
                        recv(stop_rx) -> _ => break,
                    }
                }
            })?;

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn stop(&mut self) {
        // Disconnecting the stop channel wakes the select
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::{MixBus, Renderer};
    use crate::command::{CommandBus, LaneMessage};
    use crate::testutil::{write_song, TEST_RATE};
    use crate::transport::EngineOptions;

    const BLOCK: usize = 80;

    fn engine(secs: f32) -> (tempfile::TempDir, MixerEngine, Renderer) {
        let dir = tempfile::tempdir().unwrap();
        let song = write_song(dir.path(), secs);
        let bus = Arc::new(MixBus::new(TEST_RATE));
        let mut engine =
            MixerEngine::load(bus.clone(), &song.as_array(), None, &EngineOptions::default())
                .unwrap();
        engine.attach();
        (dir, engine, Renderer::new(bus))
    }

    #[test]
    fn detects_natural_end_within_one_tick() {
        let (_dir, mut engine, mut renderer) = engine(2.0);
        let poller = TransportPoller::default();
        engine.play();

        let tick_frames = (TEST_RATE as f64 * poller.interval().as_secs_f64()) as usize;
        let mut rendered = 0usize;
        let mut ended_at = None;
        for _ in 0..40 {
            for _ in 0..tick_frames / BLOCK {
                renderer.mix(BLOCK);
            }
            rendered += tick_frames;
            if poller.tick(&mut engine) == TickOutcome::Ended {
                ended_at = Some(rendered as f64 / TEST_RATE as f64);
                break;
            }
        }

        let ended_at = ended_at.expect("end of track not detected");
        // Audio ends at 2.01s (10 ms start lead)
        assert!(ended_at >= 2.01 && ended_at <= 2.01 + 0.1, "{}", ended_at);
        assert_eq!(engine.state(), TransportState::Stopped);
        assert_eq!(engine.position(), 2.0);
        assert!(!engine.channels().iter().any(|c| c.is_playing()));
    }

    #[test]
    fn samples_while_playing() {
        let (_dir, mut engine, mut renderer) = engine(2.0);
        let poller = TransportPoller::default();
        assert_eq!(poller.tick(&mut engine), TickOutcome::Idle);
        engine.play();
        for _ in 0..10 {
            renderer.mix(BLOCK);
        }
        assert_eq!(poller.tick(&mut engine), TickOutcome::Sampled);
        assert!((engine.position() - 0.09).abs() < 1e-9);
    }

    #[test]
    fn scrub_suppresses_sampling() {
        let (_dir, mut engine, mut renderer) = engine(2.0);
        let poller = TransportPoller::default();
        engine.play();
        renderer.mix(800);
        engine.begin_scrub();
        renderer.mix(800);
        assert_eq!(poller.tick(&mut engine), TickOutcome::Suppressed);
        assert_eq!(engine.position(), 0.0);
    }

    #[test]
    fn bus_fault_stops_transport() {
        let (_dir, mut engine, mut renderer) = engine(2.0);
        let poller = TransportPoller::default();
        engine.play();
        renderer.mix(800);
        engine.bus().report_fault("stream closed".into());
        assert_eq!(
            poller.tick(&mut engine),
            TickOutcome::Faulted("stream closed".into())
        );
        assert_eq!(engine.state(), TransportState::Stopped);

        // The engine keeps accepting operations afterwards
        engine.play();
        renderer.mix(800);
        assert_eq!(poller.tick(&mut engine), TickOutcome::Sampled);
    }

    #[test]
    fn unexpected_stop_is_a_fault() {
        let (_dir, mut engine, _renderer) = engine(2.0);
        let poller = TransportPoller::default();
        engine.play();
        engine.channels()[0].pause();
        assert!(matches!(poller.tick(&mut engine), TickOutcome::Faulted(_)));
        assert!(engine.fault().is_some());
    }

    #[test]
    fn ticker_posts_ticks_until_stopped() {
        let bus = CommandBus::new();
        let receiver = bus.receiver();
        let mut ticker = Ticker::start(Duration::from_millis(5), bus.sender()).unwrap();
        let msg = receiver
            .recv_timeout(Duration::from_secs(2))
            .expect("no tick received");
        assert!(matches!(
            msg,
            LaneMessage::Command(Command::Tick, CommandSource::Ticker)
        ));
        ticker.stop();
        assert!(!ticker.is_running());
    }
}
