//! Mapping between a vertical fader handle position and linear gain.
//!
//! The track runs top to bottom: `track_min` is the top of the track (full
//! volume) and `track_max` the bottom (silence).

/// Convert a handle position on the fader track to a gain in `[0, 1]`.
///
/// Positions outside the track clamp to the nearest end.
pub fn position_to_volume(position: f32, track_min: f32, track_max: f32) -> f32 {
    let range = track_max - track_min;
    if range <= 0.0 {
        return 1.0;
    }
    let bounded = position.clamp(track_min, track_max);
    (1.0 - (bounded - track_min) / range).clamp(0.0, 1.0)
}

/// Convert a gain back to a handle position. Inverse of [`position_to_volume`].
pub fn volume_to_position(volume: f32, track_min: f32, track_max: f32) -> f32 {
    let range = track_max - track_min;
    if range <= 0.0 {
        return track_min;
    }
    let v = volume.clamp(0.0, 1.0);
    (track_max - v * range).clamp(track_min, track_max)
}
