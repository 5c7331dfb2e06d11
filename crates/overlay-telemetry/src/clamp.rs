//! Pure numeric clamp helpers.
//!
//! The broadcast feed occasionally carries out-of-range values (unset best
//! laps, negative stint timers); consumers clamp before projecting.

/// Return `value`, raised to `min` when below it.
pub fn clamp_min(value: f64, min: f64) -> f64 {
    if value < min { min } else { value }
}

/// Return `value`, lowered to `max` when above it.
pub fn clamp_max(value: f64, max: f64) -> f64 {
    if value > max { max } else { value }
}
