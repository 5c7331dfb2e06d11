//! Rate-decoupled rolling input trace for OpenOverlay.
//!
//! A timer samples the latest available driver inputs at a configurable
//! frequency, independent of the telemetry source's native push rate, into a
//! fixed-capacity ring that feeds a trace display.
//!
//! ## Modules
//! - `history` - `InputSample` and the fixed-capacity `SampleHistory` ring
//! - `sampler` - `InputTraceSampler`, the timer-driven collection task

use std::time::Duration;

use serde::{Deserialize, Serialize};

use openoverlay_telemetry::TelemetryError;

pub mod history;
pub mod sampler;

pub use history::{InputSample, SampleHistory};
pub use sampler::{InputTraceSampler, SampleProvider};

/// Valid range for the number of retained samples.
pub const CAPACITY_RANGE: std::ops::RangeInclusive<usize> = 150..=800;

/// Valid range for the sampling frequency.
pub const SAMPLE_RATE_HZ_RANGE: std::ops::RangeInclusive<u32> = 10..=70;

pub const DEFAULT_CAPACITY: usize = 300;
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 30;

/// Validated trace configuration. Out-of-range values are rejected at
/// construction, before any timer starts; deserialization funnels through
/// the same checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTraceConfig")]
pub struct TraceConfig {
    capacity: usize,
    sample_rate_hz: u32,
}

/// Unvalidated mirror used only during deserialization.
#[derive(Deserialize)]
struct RawTraceConfig {
    capacity: usize,
    sample_rate_hz: u32,
}

impl TryFrom<RawTraceConfig> for TraceConfig {
    type Error = TelemetryError;

    fn try_from(raw: RawTraceConfig) -> Result<Self, Self::Error> {
        Self::new(raw.capacity, raw.sample_rate_hz)
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
        }
    }
}

impl TraceConfig {
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidConfig`] when either knob is outside
    /// its documented range.
    pub fn new(capacity: usize, sample_rate_hz: u32) -> Result<Self, TelemetryError> {
        if !CAPACITY_RANGE.contains(&capacity) {
            return Err(TelemetryError::InvalidConfig {
                field: "capacity",
                value: capacity.to_string(),
                range: "150..=800",
            });
        }
        if !SAMPLE_RATE_HZ_RANGE.contains(&sample_rate_hz) {
            return Err(TelemetryError::InvalidConfig {
                field: "sample_rate_hz",
                value: sample_rate_hz.to_string(),
                range: "10..=70",
            });
        }
        Ok(Self {
            capacity,
            sample_rate_hz,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Tick period for the sampling timer.
    pub fn sample_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.sample_rate_hz.max(1)))
    }
}
