use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::decode::StemBuffer;

/// Output frame counter shared by the render thread and the control lane.
///
/// `now()` is the first frame the renderer has not yet claimed, so any
/// deadline at or after `now()` lands in a future block.
pub struct ReferenceClock {
    sample_rate: u32,
    frames: AtomicU64,
}

impl ReferenceClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            frames: AtomicU64::new(0),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn now(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Claim the next `frames` frames, returning the first one
    fn advance(&self, frames: u64) -> u64 {
        self.frames.fetch_add(frames, Ordering::AcqRel)
    }

    pub fn secs_to_frames(&self, secs: f64) -> u64 {
        (secs.max(0.0) * self.sample_rate as f64).round() as u64
    }

    pub fn frames_to_secs(&self, frames: u64) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        frames as f64 / self.sample_rate as f64
    }
}

/// Render-side playback state of a voice
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceState {
    /// Not producing output, cursor parked
    Idle,
    /// Waiting for the clock to reach `start`
    Scheduled { start: u64 },
    Playing,
    /// Ran off the end of the buffer
    Finished,
}

/// One decoded stem plus its playback cursor and gain
pub struct Voice {
    buffer: StemBuffer,
    cursor: u64,
    gain: f32,
    state: VoiceState,
}

pub type VoiceHandle = Arc<Mutex<Voice>>;

impl Voice {
    pub fn new(buffer: StemBuffer) -> Self {
        Self {
            buffer,
            cursor: 0,
            gain: 1.0,
            state: VoiceState::Idle,
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.buffer.frames()
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(
            self.state,
            VoiceState::Playing | VoiceState::Scheduled { .. }
        )
    }

    pub fn schedule(&mut self, start: u64) {
        if self.cursor >= self.total_frames() {
            self.state = VoiceState::Finished;
            return;
        }
        self.state = VoiceState::Scheduled { start };
    }

    pub fn stop(&mut self) {
        if self.state != VoiceState::Finished {
            self.state = VoiceState::Idle;
        }
    }

    /// Move the cursor; a playing voice keeps playing from there
    pub fn seek(&mut self, frame: u64) {
        self.cursor = frame.min(self.total_frames());
        if self.state == VoiceState::Finished {
            self.state = VoiceState::Idle;
        }
        if self.state == VoiceState::Playing && self.cursor >= self.total_frames() {
            self.state = VoiceState::Finished;
        }
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    /// Add this voice into an interleaved stereo block starting at `block_start`
    pub fn render_into(&mut self, block_start: u64, mix: &mut [f32]) {
        let frames = mix.len() / 2;
        let total = self.total_frames();

        let offset = match self.state {
            VoiceState::Idle | VoiceState::Finished => return,
            VoiceState::Playing => 0,
            VoiceState::Scheduled { start } => {
                let block_end = block_start + frames as u64;
                if start >= block_end {
                    return;
                }
                self.state = VoiceState::Playing;
                if start >= block_start {
                    (start - block_start) as usize
                } else {
                    // Late start: skip ahead so every voice sharing the
                    // deadline stays on the same source frame
                    self.cursor = (self.cursor + (block_start - start)).min(total);
                    0
                }
            }
        };

        for i in offset..frames {
            if self.cursor >= total {
                break;
            }
            let (l, r) = self.buffer.frame(self.cursor);
            mix[i * 2] += l * self.gain;
            mix[i * 2 + 1] += r * self.gain;
            self.cursor += 1;
        }

        if self.cursor >= total {
            self.state = VoiceState::Finished;
        }
    }
}

/// Sums attached voices into the output and keeps the reference clock
pub struct MixBus {
    clock: ReferenceClock,
    voices: RwLock<Vec<VoiceHandle>>,
    fault: Mutex<Option<String>>,
}

impl MixBus {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            clock: ReferenceClock::new(sample_rate),
            voices: RwLock::new(Vec::new()),
            fault: Mutex::new(None),
        }
    }

    pub fn clock(&self) -> &ReferenceClock {
        &self.clock
    }

    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    pub fn attach(&self, handles: &[VoiceHandle]) {
        let mut voices = self.voices.write();
        for handle in handles {
            if !voices.iter().any(|v| Arc::ptr_eq(v, handle)) {
                voices.push(handle.clone());
            }
        }
    }

    pub fn detach(&self, handles: &[VoiceHandle]) {
        self.voices
            .write()
            .retain(|v| !handles.iter().any(|h| Arc::ptr_eq(v, h)));
    }

    pub fn attached(&self) -> usize {
        self.voices.read().len()
    }

    /// Record an output fault; the transport poller picks it up
    pub fn report_fault(&self, message: String) {
        let mut fault = self.fault.lock();
        if fault.is_none() {
            *fault = Some(message);
        }
    }

    pub fn take_fault(&self) -> Option<String> {
        self.fault.lock().take()
    }
}

/// Render-thread side of the bus, owning the scratch mix buffer
pub struct Renderer {
    bus: Arc<MixBus>,
    scratch: Vec<f32>,
}

impl Renderer {
    pub fn new(bus: Arc<MixBus>) -> Self {
        Self {
            bus,
            scratch: Vec::with_capacity(8192),
        }
    }

    /// Render `frames` stereo frames and return them interleaved
    pub fn mix(&mut self, frames: usize) -> &[f32] {
        self.scratch.clear();
        self.scratch.resize(frames * 2, 0.0);

        let block_start = self.bus.clock.advance(frames as u64);
        // Voice locks are only held by the control lane for O(1) updates
        for voice in self.bus.voices.read().iter() {
            voice.lock().render_into(block_start, &mut self.scratch);
        }

        for s in self.scratch.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }
        &self.scratch
    }

    /// Render into an interleaved device buffer with `channels` channels
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let frames = out.len() / channels;
        let mixed = self.mix(frames);
        for (frame, pair) in out.chunks_mut(channels).zip(mixed.chunks_exact(2)) {
            for (ch, sample) in frame.iter_mut().enumerate() {
                *sample = channel_value(ch, pair[0], pair[1]);
            }
        }
    }
}

/// Left to channel 0, right to channel 1, their mean to the rest
#[inline]
pub fn channel_value(ch: usize, left: f32, right: f32) -> f32 {
    match ch {
        0 => left,
        1 => right,
        _ => (left + right) * 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize) -> StemBuffer {
        let samples = (0..frames)
            .flat_map(|i| {
                let v = i as f32 / frames as f32;
                [v, v]
            })
            .collect();
        StemBuffer::from_interleaved(samples, 1000)
    }

    #[test]
    fn scheduled_voice_starts_on_deadline_frame() {
        let mut voice = Voice::new(ramp(100));
        voice.schedule(5);
        let mut mix = vec![0.0; 20];
        voice.render_into(0, &mut mix);
        assert_eq!(voice.state(), VoiceState::Playing);
        assert_eq!(voice.cursor(), 5);
        assert_eq!(mix[0], 0.0);
        assert_eq!(mix[8], 0.0);
    }

    #[test]
    fn late_voice_catches_up() {
        let mut on_time = Voice::new(ramp(100));
        let mut late = Voice::new(ramp(100));
        on_time.schedule(10);
        let mut mix = vec![0.0; 40];
        on_time.render_into(0, &mut mix);
        on_time.render_into(20, &mut mix);

        // Scheduled with the same deadline but first seen one block later
        late.schedule(10);
        let mut mix = vec![0.0; 40];
        late.render_into(20, &mut mix);
        assert_eq!(late.cursor(), on_time.cursor());
    }

    #[test]
    fn finishes_at_end_and_keeps_cursor() {
        let mut voice = Voice::new(ramp(10));
        voice.schedule(0);
        let mut mix = vec![0.0; 64];
        voice.render_into(0, &mut mix);
        assert_eq!(voice.state(), VoiceState::Finished);
        assert!(!voice.is_playing());
        assert_eq!(voice.cursor(), 10);
    }

    #[test]
    fn gain_scales_output() {
        let mut voice = Voice::new(StemBuffer::from_interleaved(vec![0.5; 20], 1000));
        voice.set_gain(0.5);
        voice.schedule(0);
        let mut mix = vec![0.0; 4];
        voice.render_into(0, &mut mix);
        assert_eq!(mix, vec![0.25; 4]);
    }

    #[test]
    fn renderer_advances_clock_and_sums_voices() {
        let bus = Arc::new(MixBus::new(1000));
        let a: VoiceHandle = Arc::new(Mutex::new(Voice::new(StemBuffer::from_interleaved(
            vec![0.25; 200],
            1000,
        ))));
        let b: VoiceHandle = Arc::new(Mutex::new(Voice::new(StemBuffer::from_interleaved(
            vec![0.5; 200],
            1000,
        ))));
        bus.attach(&[a.clone(), b.clone()]);
        a.lock().schedule(0);
        b.lock().schedule(0);

        let mut renderer = Renderer::new(bus.clone());
        let mut out = vec![0.0; 30];
        renderer.render(&mut out, 3);
        assert_eq!(bus.clock().now(), 10);
        assert_eq!(out[0], 0.75);
        assert_eq!(out[2], 0.75);

        bus.detach(&[a]);
        assert_eq!(bus.attached(), 1);
    }

    #[test]
    fn first_fault_wins() {
        let bus = MixBus::new(1000);
        bus.report_fault("device lost".into());
        bus.report_fault("second".into());
        assert_eq!(bus.take_fault().as_deref(), Some("device lost"));
        assert_eq!(bus.take_fault(), None);
    }
}
