use std::time::Duration;

use crate::{entropy::EntropySource, wheel::WheelConfig};

// Pointer at the top; rotation is clockwise degrees.
pub const MIN_FULL_SPINS: u32 = 5;
pub const MAX_FULL_SPINS: u32 = 7;
pub const SPIN_ANIMATION: Duration = Duration::from_secs(5);

pub fn draw_full_spins(entropy: &dyn EntropySource) -> u32 {
    entropy.gen_range(MIN_FULL_SPINS, MAX_FULL_SPINS)
}

/// Cumulative rotation that brings `segment` to rest centred under the pointer.
///
/// `current` is where the wheel was left by the previous spin. It is rounded
/// up to a whole turn first so that an earlier landing offset never leaks into
/// this one.
pub fn landing_rotation(current: f64, segment: u32, full_spins: u32, config: &WheelConfig) -> f64 {
    let angle = config.segment_angle();
    let base = (current / 360.0).ceil() * 360.0;
    let centre = segment as f64 * angle + angle / 2.0;
    base + full_spins as f64 * 360.0 + (360.0 - centre)
}

/// Segment that sits under the pointer for a given rotation.
pub fn segment_under_pointer(rotation: f64, config: &WheelConfig) -> u32 {
    let turned = rotation.rem_euclid(360.0);
    let wheel_angle = (360.0 - turned).rem_euclid(360.0);
    let index = (wheel_angle / config.segment_angle()).floor() as u32;
    index.min(config.segments - 1)
}
