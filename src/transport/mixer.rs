//! Four-stem mixer engine: synchronized transport plus volume/mute/solo.
//!
//! Every method here runs on the control lane; nothing in this module blocks
//! for longer than a voice lock.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::{MixBus, VoiceHandle};
use crate::error::AudioLoadError;

use super::channel::TrackChannel;
use super::clock::{PlaybackClock, DEFAULT_START_LEAD};
use super::snapshot::{time_labels, ChannelSnapshot, MixerSnapshot, TransportState};
use super::NUM_STEMS;

/// Index of the channel whose position drives the transport
pub const REFERENCE_CHANNEL: usize = 0;

/// Reference durations further apart than this from the decoded length are logged
const DURATION_MISMATCH_SECS: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub start_lead: Duration,
    pub default_volume: f32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            start_lead: DEFAULT_START_LEAD,
            default_volume: 1.0,
        }
    }
}

pub struct MixerEngine {
    bus: Arc<MixBus>,
    clock: PlaybackClock,
    channels: [TrackChannel; NUM_STEMS],
    state: TransportState,
    position: f64,
    duration: f64,
    soloed: Option<usize>,
    /// Preview position while a scrub gesture is held
    scrub: Option<f64>,
    fault: Option<String>,
    attached: bool,
}

impl MixerEngine {
    /// Decode all four stems. Either every channel is primed or none is.
    pub fn load(
        bus: Arc<MixBus>,
        paths: &[PathBuf; NUM_STEMS],
        reference_duration: Option<f64>,
        options: &EngineOptions,
    ) -> Result<Self, AudioLoadError> {
        let sample_rate = bus.sample_rate();
        let mut channels: [TrackChannel; NUM_STEMS] =
            std::array::from_fn(|i| TrackChannel::new(i, sample_rate, options.default_volume));

        let results: Vec<Result<f64, AudioLoadError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = channels
                .iter_mut()
                .zip(paths.iter())
                .map(|(channel, path)| scope.spawn(move || channel.load(path)))
                .collect();
            handles
                .into_iter()
                .zip(paths.iter())
                .map(|(handle, path)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(AudioLoadError::Unreadable {
                            path: path.clone(),
                            reason: "decoder panicked".to_string(),
                        })
                    })
                })
                .collect()
        });

        let mut durations = [0.0; NUM_STEMS];
        for (i, result) in results.into_iter().enumerate() {
            durations[i] = result?;
        }

        let duration = durations[REFERENCE_CHANNEL];
        if let Some(expected) = reference_duration {
            if (expected - duration).abs() > DURATION_MISMATCH_SECS {
                log::warn!(
                    "Reference duration {:.2}s differs from decoded {:.2}s, using decoded",
                    expected,
                    duration
                );
            }
        }
        log::info!(
            "Loaded 4 stems ({:.2}s) at {} Hz",
            duration,
            sample_rate
        );

        Ok(Self {
            clock: PlaybackClock::new(bus.clone(), options.start_lead),
            bus,
            channels,
            state: TransportState::Stopped,
            position: 0.0,
            duration,
            soloed: None,
            scrub: None,
            fault: None,
            attached: false,
        })
    }

    fn voices(&self) -> Vec<VoiceHandle> {
        self.channels
            .iter()
            .filter_map(|c| c.voice().cloned())
            .collect()
    }

    /// Hand the voices to the renderer
    pub fn attach(&mut self) {
        if !self.attached {
            self.bus.attach(&self.voices());
            self.attached = true;
        }
    }

    pub fn bus(&self) -> &Arc<MixBus> {
        &self.bus
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn soloed(&self) -> Option<usize> {
        self.soloed
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrub.is_some()
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    pub fn channel(&self, index: usize) -> Option<&TrackChannel> {
        self.channels.get(index)
    }

    pub fn channels(&self) -> &[TrackChannel; NUM_STEMS] {
        &self.channels
    }

    fn clamp_time(&self, secs: f64) -> f64 {
        if !secs.is_finite() {
            return 0.0;
        }
        secs.clamp(0.0, self.duration)
    }

    // === Transport ===

    pub fn play(&mut self) {
        if self.state == TransportState::Playing {
            return;
        }
        // Nothing left to play on the reference channel: start over
        if self.position >= self.duration {
            self.seek_all(0.0);
            self.position = 0.0;
        }
        self.fault = None;
        self.start_all();
    }

    /// Schedule every channel on one shared deadline
    fn start_all(&mut self) {
        let deadline = self.clock.compute_start_deadline();
        for channel in &self.channels {
            channel.play_at(deadline);
        }
        self.state = TransportState::Playing;
        log::debug!("Play at frame {} from {:.3}s", deadline, self.position);
    }

    pub fn pause(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }
        self.stop_aligned();
        self.state = TransportState::Paused;
        log::debug!("Paused at {:.3}s", self.position);
    }

    /// Stop every voice and pull the others onto the reference cursor.
    /// A block rendered between two voice stops would otherwise leave them
    /// a block apart.
    fn stop_aligned(&mut self) {
        self.pause_all();
        let frame = self.channels[REFERENCE_CHANNEL].position_frames();
        for channel in &self.channels[REFERENCE_CHANNEL + 1..] {
            channel.seek_frame(frame);
        }
        self.position = self.clamp_time(self.channels[REFERENCE_CHANNEL].position());
    }

    fn pause_all(&self) {
        for channel in &self.channels {
            channel.pause();
        }
    }

    fn seek_all(&self, secs: f64) {
        for channel in &self.channels {
            channel.seek(secs);
        }
    }

    /// Seek every channel; a playing song resumes in sync from `secs`
    pub fn seek(&mut self, secs: f64) {
        let target = self.clamp_time(secs);
        if self.state == TransportState::Playing {
            self.pause_all();
            self.seek_all(target);
            self.position = target;
            self.start_all();
        } else {
            self.seek_all(target);
            self.position = target;
        }
        log::debug!("Seek to {:.3}s ({})", target, self.state.name());
    }

    /// Sample the reference channel while playing
    pub fn refresh_position(&mut self) -> f64 {
        if self.state == TransportState::Playing {
            self.position = self.clamp_time(self.channels[REFERENCE_CHANNEL].position());
        }
        self.position
    }

    pub fn reference_is_playing(&self) -> bool {
        self.channels[REFERENCE_CHANNEL].is_playing()
    }

    /// Natural end of track: stop everything, keep the position at the end
    pub fn finish(&mut self) {
        self.pause_all();
        self.state = TransportState::Stopped;
        log::info!("Reached end of track at {:.3}s", self.position);
    }

    /// Playback fault: stop with the reason recorded for the snapshot
    pub fn report_fault(&mut self, message: String) {
        self.stop_aligned();
        self.state = TransportState::Stopped;
        log::warn!("Playback fault: {}", message);
        self.fault = Some(message);
    }

    // === Scrub gesture ===

    pub fn begin_scrub(&mut self) {
        if self.scrub.is_none() {
            self.scrub = Some(self.position);
        }
    }

    /// Move the preview only; transport is untouched until the scrub ends
    pub fn scrub_to(&mut self, secs: f64) {
        let target = self.clamp_time(secs);
        self.scrub = Some(target);
    }

    pub fn end_scrub(&mut self, secs: f64) {
        self.scrub = None;
        self.seek(secs);
    }

    pub fn cancel_scrub(&mut self) {
        self.scrub = None;
    }

    // === Volume / mute / solo ===

    fn is_soloed_out(&self, index: usize) -> bool {
        matches!(self.soloed, Some(solo) if solo != index)
    }

    fn effective_volume(&self, index: usize) -> f32 {
        let channel = &self.channels[index];
        if channel.is_muted() || self.is_soloed_out(index) {
            0.0
        } else {
            channel.user_volume()
        }
    }

    fn apply_effective(&mut self, index: usize) {
        let volume = self.effective_volume(index);
        self.channels[index].set_volume(volume);
    }

    fn apply_all(&mut self) {
        for index in 0..NUM_STEMS {
            self.apply_effective(index);
        }
    }

    fn valid(&self, index: usize, op: &str) -> bool {
        if index < NUM_STEMS {
            true
        } else {
            log::warn!("{} ignored: no channel {}", op, index);
            false
        }
    }

    pub fn set_volume(&mut self, index: usize, volume: f32) {
        if !self.valid(index, "set_volume") {
            return;
        }
        let volume = if volume.is_finite() { volume } else { 0.0 };
        self.channels[index].set_user_volume(volume);
        self.apply_effective(index);
    }

    pub fn toggle_mute(&mut self, index: usize) {
        if !self.valid(index, "toggle_mute") {
            return;
        }
        let muted = !self.channels[index].is_muted();
        self.channels[index].set_muted(muted);
        self.apply_effective(index);
    }

    /// Silence every other channel without touching their settings
    pub fn begin_solo(&mut self, index: usize) {
        if !self.valid(index, "begin_solo") || self.soloed == Some(index) {
            return;
        }
        self.soloed = Some(index);
        self.apply_all();
    }

    pub fn end_solo(&mut self, index: usize) {
        if self.soloed != Some(index) {
            return;
        }
        self.soloed = None;
        self.apply_all();
    }

    // === Snapshot ===

    pub fn snapshot(&self, title: Option<String>, revision: u64) -> MixerSnapshot {
        let channels = std::array::from_fn(|i| {
            let channel = &self.channels[i];
            ChannelSnapshot {
                effective_volume: channel.volume(),
                user_volume: channel.user_volume(),
                muted: channel.is_muted(),
                soloed_out: self.is_soloed_out(i),
            }
        });
        let display = self.scrub.unwrap_or(self.position);
        let (elapsed_label, remaining_label) = time_labels(display, self.duration);

        MixerSnapshot {
            loaded: true,
            title,
            state: self.state,
            position: self.position,
            duration: self.duration,
            channels,
            soloed: self.soloed,
            scrubbing: self.scrub.is_some(),
            scrub_position: self.scrub,
            elapsed_label,
            remaining_label,
            fault: self.fault.clone(),
            revision,
        }
    }
}

impl Drop for MixerEngine {
    fn drop(&mut self) {
        self.pause_all();
        if self.attached {
            self.bus.detach(&self.voices());
        }
    }
}
