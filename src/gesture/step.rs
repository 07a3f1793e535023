//! Fine volume step arithmetic

use super::pointer::ScrollDirection;

/// Gain change per fine step
pub const FINE_STEP: f64 = 0.01;

/// Above this an upward step snaps to full volume
pub const UPPER_RAIL: f64 = 0.9975;

/// Below this a downward step snaps to mute
pub const LOWER_RAIL: f64 = 0.0025;

/// Compute the level one fine step away from `current`.
///
/// The result is rounded to two decimals. Rounding alone can leave the
/// level parked at 0.99 or 0.01 forever, so a step that lands past the
/// rail threshold is forced to exactly 1.0 or 0.0.
pub fn next_fine_level(current: f32, direction: ScrollDirection) -> f32 {
    let current = f64::from(current);
    let level = match direction {
        ScrollDirection::Up => {
            let level = round_to_hundredths(current + FINE_STEP);
            if level > UPPER_RAIL {
                1.0
            } else {
                level
            }
        }
        ScrollDirection::Down => {
            let level = round_to_hundredths(current - FINE_STEP);
            if level < LOWER_RAIL {
                0.0
            } else {
                level
            }
        }
    };

    level.clamp(0.0, 1.0) as f32
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
