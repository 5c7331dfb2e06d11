//! Decoded telemetry payloads.
//!
//! Every snapshot is an immutable value replaced wholesale on each push from
//! the source; consumers never receive partial updates.

use serde::{Deserialize, Serialize};

/// Sentinel value of [`GraphicsSnapshot::stint_time_left_ms`] meaning the
/// session has no driver-stint concept (practice, hotlap, ...).
///
/// Distinct from a stint with zero time left.
pub const NO_ACTIVE_STINT: f64 = -1.0;

/// Per-wheel values in fixed order: front-left, front-right, rear-left,
/// rear-right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelSet(pub [f32; 4]);

impl WheelSet {
    pub fn new(fl: f32, fr: f32, rl: f32, rr: f32) -> Self {
        Self([fl, fr, rl, rr])
    }

    pub fn front_left(&self) -> f32 {
        self.0[0]
    }

    pub fn front_right(&self) -> f32 {
        self.0[1]
    }

    pub fn rear_left(&self) -> f32 {
        self.0[2]
    }

    pub fn rear_right(&self) -> f32 {
        self.0[3]
    }

    pub fn front_average(&self) -> f32 {
        (self.0[0] + self.0[1]) / 2.0
    }

    pub fn rear_average(&self) -> f32 {
        (self.0[2] + self.0[3]) / 2.0
    }
}

/// Instantaneous vehicle state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicsSnapshot {
    /// Fuel on board, liters. Never negative in well-formed data.
    pub fuel_l: f32,
    /// Tank capacity, liters.
    pub max_fuel_l: f32,
    pub tyre_pressure_psi: WheelSet,
    pub tyre_temp_c: WheelSet,
    pub brake_temp_c: WheelSet,
    /// Normalized 0..=1.
    pub throttle: f32,
    /// Normalized 0..=1.
    pub brake: f32,
    /// Degrees, negative is left.
    pub steering_angle: f32,
}

impl PhysicsSnapshot {
    /// Remaining fuel as a fraction of tank capacity, 0 when the capacity
    /// is unknown.
    pub fn fuel_fraction(&self) -> f32 {
        if self.max_fuel_l <= 0.0 {
            return 0.0;
        }
        self.fuel_l / self.max_fuel_l
    }
}

/// Session-relative derived state as published by the simulator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphicsSnapshot {
    /// Fuel burn per lap, liters.
    pub fuel_per_lap_l: f64,
    /// Laps possible on the current fuel load at the current burn rate.
    pub fuel_estimated_laps: f64,
    pub best_lap_time_ms: f64,
    pub session_time_left_ms: f64,
    /// Milliseconds, or [`NO_ACTIVE_STINT`].
    pub stint_time_left_ms: f64,
    pub used_fuel_since_refuel_l: f64,
}

impl GraphicsSnapshot {
    pub fn has_active_stint(&self) -> bool {
        self.stint_time_left_ms > NO_ACTIVE_STINT
    }
}

/// Session-invariant configuration, set once per session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticInfo {
    pub car_model: String,
    pub track_name: String,
    pub max_fuel_l: f32,
}

/// Per-car realtime update from the broadcast feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarUpdate {
    pub car_index: u16,
    pub position: u16,
    pub laps: u16,
    pub delta_ms: i32,
}
