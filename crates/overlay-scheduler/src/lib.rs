//! Per-overlay periodic render scheduling.
//!
//! Each overlay instance gets its own cancellable periodic task that invokes
//! the overlay's render step at a configured frequency, independent of other
//! overlays and of the hub's native push rate. Overlays pull the latest
//! derived state on each tick and tolerate staleness; they never block on
//! the hub.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use openoverlay_telemetry::TelemetryError;

/// Valid range for the per-overlay refresh frequency.
pub const REFRESH_RATE_HZ_RANGE: std::ops::RangeInclusive<u32> = 1..=60;

pub const DEFAULT_REFRESH_RATE_HZ: u32 = 2;

/// One overlay's tick contract.
///
/// `should_render` gates every tick and must be cheap and side-effect free;
/// an overlay with no valid session simply suppresses its render step
/// instead of drawing stale numbers.
pub trait Overlay: Send + 'static {
    fn name(&self) -> &str;

    /// Evaluated every tick before `render_tick`.
    fn should_render(&self) -> bool;

    /// Produce the next visual state from the latest pulled values.
    fn render_tick(&mut self);
}

/// Validated scheduler configuration. Deserialization funnels through the
/// same range checks as [`SchedulerConfig::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchedulerConfig")]
pub struct SchedulerConfig {
    refresh_rate_hz: u32,
}

/// Unvalidated mirror used only during deserialization.
#[derive(Deserialize)]
struct RawSchedulerConfig {
    refresh_rate_hz: u32,
}

impl TryFrom<RawSchedulerConfig> for SchedulerConfig {
    type Error = TelemetryError;

    fn try_from(raw: RawSchedulerConfig) -> Result<Self, Self::Error> {
        Self::new(raw.refresh_rate_hz)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: DEFAULT_REFRESH_RATE_HZ,
        }
    }
}

impl SchedulerConfig {
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidConfig`] when the rate is outside
    /// [`REFRESH_RATE_HZ_RANGE`].
    pub fn new(refresh_rate_hz: u32) -> Result<Self, TelemetryError> {
        if !REFRESH_RATE_HZ_RANGE.contains(&refresh_rate_hz) {
            return Err(TelemetryError::InvalidConfig {
                field: "refresh_rate_hz",
                value: refresh_rate_hz.to_string(),
                range: "1..=60",
            });
        }
        Ok(Self { refresh_rate_hz })
    }

    pub fn refresh_rate_hz(&self) -> u32 {
        self.refresh_rate_hz
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.refresh_rate_hz.max(1)))
    }
}

/// Drives one overlay at its configured refresh rate.
///
/// `start`/`stop` are idempotent; dropping the scheduler stops the task.
pub struct OverlayScheduler {
    config: SchedulerConfig,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl OverlayScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            task: Mutex::new(None),
        }
    }

    /// Begin ticking `overlay`. No-op when already started.
    pub fn start<O: Overlay>(&self, mut overlay: O) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.is_some() {
            debug!("Overlay scheduler already running");
            return;
        }

        let period = self.config.tick_interval();
        debug!(
            overlay = overlay.name(),
            rate_hz = self.config.refresh_rate_hz(),
            "Overlay scheduler started"
        );
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if overlay.should_render() {
                    overlay.render_tick();
                }
            }
        }));
    }

    /// Halt ticking and release the timer. No-op when already stopped.
    pub fn stop(&self) {
        let handle = {
            let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
            task.take()
        };
        match handle {
            Some(handle) => {
                handle.abort();
                debug!("Overlay scheduler stopped");
            }
            None => debug!("Stop requested while scheduler not running"),
        }
    }

    pub fn is_running(&self) -> bool {
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        task.is_some()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

impl Drop for OverlayScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
