use std::sync::Arc;
use std::time::Duration;

use crate::audio::MixBus;

/// Lead between computing a start deadline and the deadline itself
pub const DEFAULT_START_LEAD: Duration = Duration::from_millis(10);

/// Computes shared start deadlines on the output frame clock.
///
/// Every channel told to start at the same deadline begins on the same
/// output frame, no matter when its `play_at` call was issued.
pub struct PlaybackClock {
    bus: Arc<MixBus>,
    lead_frames: u64,
}

impl PlaybackClock {
    pub fn new(bus: Arc<MixBus>, lead: Duration) -> Self {
        let lead_frames = bus.clock().secs_to_frames(lead.as_secs_f64()).max(1);
        Self { bus, lead_frames }
    }

    /// Current reference-clock frame
    pub fn now(&self) -> u64 {
        self.bus.clock().now()
    }

    pub fn lead_frames(&self) -> u64 {
        self.lead_frames
    }

    /// "now + lead", in output frames
    pub fn compute_start_deadline(&self) -> u64 {
        self.now() + self.lead_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Renderer;

    #[test]
    fn deadline_is_now_plus_lead() {
        let bus = Arc::new(MixBus::new(48000));
        let clock = PlaybackClock::new(bus.clone(), DEFAULT_START_LEAD);
        assert_eq!(clock.lead_frames(), 480);
        assert_eq!(clock.compute_start_deadline(), 480);

        let mut renderer = Renderer::new(bus);
        renderer.mix(512);
        assert_eq!(clock.now(), 512);
        assert_eq!(clock.compute_start_deadline(), 992);
    }

    #[test]
    fn lead_is_never_zero() {
        let bus = Arc::new(MixBus::new(48000));
        let clock = PlaybackClock::new(bus, Duration::ZERO);
        assert_eq!(clock.lead_frames(), 1);
    }
}
