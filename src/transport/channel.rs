use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::audio::{decode_file, Voice, VoiceHandle};
use crate::error::AudioLoadError;

/// One stem: its decoded source, playback handle and mixer settings
pub struct TrackChannel {
    index: usize,
    sample_rate: u32,
    voice: Option<VoiceHandle>,
    duration: f64,
    /// Gain actually applied to the voice
    volume: f32,
    /// Last fader value, kept while muted or soloed out
    user_volume: f32,
    muted: bool,
}

impl TrackChannel {
    pub fn new(index: usize, sample_rate: u32, user_volume: f32) -> Self {
        let user_volume = user_volume.clamp(0.0, 1.0);
        Self {
            index,
            sample_rate,
            voice: None,
            duration: 0.0,
            volume: user_volume,
            user_volume,
            muted: false,
        }
    }

    /// Decode `path` and prime the voice. Returns the stem duration in seconds.
    pub fn load(&mut self, path: &Path) -> Result<f64, AudioLoadError> {
        let buffer = decode_file(path, self.sample_rate)?;
        if buffer.frames() == 0 {
            return Err(AudioLoadError::Empty {
                path: path.to_path_buf(),
            });
        }
        self.duration = buffer.duration_secs();
        let mut voice = Voice::new(buffer);
        voice.set_gain(self.volume);
        self.voice = Some(Arc::new(Mutex::new(voice)));
        Ok(self.duration)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_loaded(&self) -> bool {
        self.voice.is_some()
    }

    pub(crate) fn voice(&self) -> Option<&VoiceHandle> {
        self.voice.as_ref()
    }

    /// Start at `deadline` (reference-clock frame) from the current position
    pub fn play_at(&self, deadline: u64) {
        if let Some(voice) = &self.voice {
            voice.lock().schedule(deadline);
        }
    }

    pub fn pause(&self) {
        if let Some(voice) = &self.voice {
            voice.lock().stop();
        }
    }

    /// Move to `secs`, clamped to the stem
    pub fn seek(&self, secs: f64) {
        if let Some(voice) = &self.voice {
            let secs = if secs.is_finite() { secs } else { 0.0 };
            let frame = (secs.clamp(0.0, self.duration) * self.sample_rate as f64).round() as u64;
            voice.lock().seek(frame);
        }
    }

    /// Move to a frame of this stem, clamped to its end
    pub(crate) fn seek_frame(&self, frame: u64) {
        if let Some(voice) = &self.voice {
            voice.lock().seek(frame);
        }
    }

    /// Apply linear gain immediately
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(voice) = &self.voice {
            voice.lock().set_gain(self.volume);
        }
    }

    pub fn position(&self) -> f64 {
        match &self.voice {
            Some(voice) => voice.lock().cursor() as f64 / self.sample_rate.max(1) as f64,
            None => 0.0,
        }
    }

    pub fn position_frames(&self) -> u64 {
        self.voice.as_ref().map(|v| v.lock().cursor()).unwrap_or(0)
    }

    pub fn is_playing(&self) -> bool {
        self.voice
            .as_ref()
            .map(|v| v.lock().is_playing())
            .unwrap_or(false)
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn user_volume(&self) -> f32 {
        self.user_volume
    }

    pub fn set_user_volume(&mut self, volume: f32) {
        self.user_volume = volume.clamp(0.0, 1.0);
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }
}
