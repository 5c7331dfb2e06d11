//! Fuel and stint projection for OpenOverlay.
//!
//! Turns the latest physics/graphics snapshot pair into an actionable fuel
//! recommendation: projected time until the tank runs dry, fuel needed to
//! finish the stint or the session, and how much to add at the next stop.
//!
//! The whole computation is pure and deterministic; degenerate inputs (an
//! unset best lap) yield an explicit "unavailable" result instead of a NaN
//! that would leak into a rendered overlay.

use serde::{Deserialize, Serialize};

use openoverlay_telemetry::{
    GraphicsSnapshot, NO_ACTIVE_STINT, PhysicsSnapshot, TelemetryError, clamp_max, clamp_min,
};

/// Best-lap values slower than this are treated as unrealistic (lap not set
/// yet, out-lap) and clamped for projection purposes only.
pub const MAX_PROJECTION_LAP_MS: f64 = 180_000.0;

/// Fuel fraction below which the tank state is critical.
pub const CRITICAL_FUEL_FRACTION: f64 = 0.15;

/// Valid range for the configured fuel buffer, in laps.
pub const FUEL_BUFFER_LAPS_RANGE: std::ops::RangeInclusive<u32> = 0..=3;

/// User-configured margin applied on top of the computed fuel requirement.
/// Deserialization funnels through the same range check as
/// [`FuelConfig::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFuelConfig")]
pub struct FuelConfig {
    fuel_buffer_laps: u32,
}

/// Unvalidated mirror used only during deserialization.
#[derive(Deserialize)]
struct RawFuelConfig {
    fuel_buffer_laps: u32,
}

impl TryFrom<RawFuelConfig> for FuelConfig {
    type Error = TelemetryError;

    fn try_from(raw: RawFuelConfig) -> Result<Self, Self::Error> {
        Self::new(raw.fuel_buffer_laps)
    }
}

impl Default for FuelConfig {
    fn default() -> Self {
        Self { fuel_buffer_laps: 0 }
    }
}

impl FuelConfig {
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidConfig`] when the buffer is outside
    /// [`FUEL_BUFFER_LAPS_RANGE`].
    pub fn new(fuel_buffer_laps: u32) -> Result<Self, TelemetryError> {
        if !FUEL_BUFFER_LAPS_RANGE.contains(&fuel_buffer_laps) {
            return Err(TelemetryError::InvalidConfig {
                field: "fuel_buffer_laps",
                value: fuel_buffer_laps.to_string(),
                range: "0..=3",
            });
        }
        Ok(Self { fuel_buffer_laps })
    }

    pub fn fuel_buffer_laps(&self) -> u32 {
        self.fuel_buffer_laps
    }
}

/// Inputs for one projection, captured from the latest snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelInputs {
    pub fuel_per_lap_l: f64,
    pub best_lap_time_ms: f64,
    pub fuel_estimated_laps: f64,
    pub session_time_left_ms: f64,
    /// Milliseconds, or [`NO_ACTIVE_STINT`].
    pub stint_time_left_ms: f64,
    pub used_fuel_since_refuel_l: f64,
    pub fuel_l: f64,
    pub max_fuel_l: f64,
    pub fuel_buffer_laps: u32,
}

impl FuelInputs {
    pub fn from_snapshots(
        physics: &PhysicsSnapshot,
        graphics: &GraphicsSnapshot,
        config: &FuelConfig,
    ) -> Self {
        Self {
            fuel_per_lap_l: graphics.fuel_per_lap_l,
            best_lap_time_ms: graphics.best_lap_time_ms,
            fuel_estimated_laps: graphics.fuel_estimated_laps,
            session_time_left_ms: graphics.session_time_left_ms,
            stint_time_left_ms: graphics.stint_time_left_ms,
            used_fuel_since_refuel_l: graphics.used_fuel_since_refuel_l,
            fuel_l: f64::from(physics.fuel_l),
            max_fuel_l: f64::from(physics.max_fuel_l),
            fuel_buffer_laps: config.fuel_buffer_laps(),
        }
    }

    /// Project fuel demand from these inputs.
    ///
    /// Returns `None` when no projection is possible (best lap unset, zero
    /// or NaN); callers render that as "unavailable" rather than stale
    /// numbers.
    pub fn project(&self) -> Option<FuelEstimate> {
        let best_lap_ms = clamp_max(self.best_lap_time_ms, MAX_PROJECTION_LAP_MS);
        if best_lap_ms.is_nan() || best_lap_ms <= 0.0 {
            return None;
        }

        let buffer_l = f64::from(self.fuel_buffer_laps) * self.fuel_per_lap_l;
        let stint_time_ms = clamp_min(self.stint_time_left_ms, NO_ACTIVE_STINT);
        let has_stint = stint_time_ms > NO_ACTIVE_STINT;

        let fuel_time_left_ms = self.fuel_estimated_laps * best_lap_ms;
        let fuel_to_end_l = self.session_time_left_ms / best_lap_ms * self.fuel_per_lap_l;
        let stint_fuel_l = has_stint.then(|| {
            stint_time_ms / best_lap_ms * self.fuel_per_lap_l + self.used_fuel_since_refuel_l
        });

        let fuel_to_add_l = match stint_fuel_l {
            Some(stint_fuel) => {
                clamp_min((stint_fuel - self.fuel_l).min(self.max_fuel_l) + buffer_l, 0.0)
            }
            None => clamp_min(
                (fuel_to_end_l - self.fuel_l).ceil().min(self.max_fuel_l) + buffer_l,
                0.0,
            ),
        };

        let tank = if self.max_fuel_l > 0.0 && self.fuel_l / self.max_fuel_l < CRITICAL_FUEL_FRACTION
        {
            TankLevel::Critical
        } else {
            TankLevel::Normal
        };

        let horizon_ms = if has_stint {
            stint_time_ms
        } else {
            self.session_time_left_ms
        };
        let time_status = if fuel_time_left_ms > horizon_ms {
            FuelTimeStatus::Adequate
        } else {
            FuelTimeStatus::Insufficient
        };

        Some(FuelEstimate {
            fuel_time_left_ms,
            fuel_to_end_l,
            stint_fuel_l,
            fuel_to_add_l,
            tank,
            time_status,
        })
    }
}

/// Urgency of the current tank level, used to style the fuel bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TankLevel {
    Normal,
    Critical,
}

/// Whether the projected fuel time covers the remaining stint or session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuelTimeStatus {
    Adequate,
    Insufficient,
}

/// One complete fuel projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelEstimate {
    /// Projected time until the tank empties at the current burn rate.
    pub fuel_time_left_ms: f64,
    /// Fuel required to finish the session from now, buffer excluded.
    pub fuel_to_end_l: f64,
    /// Fuel required to finish the stint; `None` when no stint is active.
    pub stint_fuel_l: Option<f64>,
    /// Recommended amount to add at the next stop, buffer included.
    pub fuel_to_add_l: f64,
    pub tank: TankLevel,
    pub time_status: FuelTimeStatus,
}
