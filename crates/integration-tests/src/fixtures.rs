//! Test doubles and canned session data.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use openoverlay_telemetry::{
    GraphicsSnapshot, NO_ACTIVE_STINT, PhysicsSnapshot, SourceCredentials, SourceEndpoint,
    StaticInfo, TelemetryError, TelemetryReceiver, TelemetrySender, TelemetrySource,
};

static TRACING: Once = Once::new();

/// Route hub lifecycle logs to the test writer. Safe to call from every test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .init();
    });
}

/// Source double for wiring tests without a live simulator: every `connect`
/// hands back a fresh channel and parks the sender where the test can reach
/// it.
#[derive(Default)]
pub struct ScriptedSource {
    senders: Arc<Mutex<Vec<TelemetrySender>>>,
    disconnects: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn senders(&self) -> Arc<Mutex<Vec<TelemetrySender>>> {
        Arc::clone(&self.senders)
    }

    pub fn disconnect_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.disconnects)
    }
}

#[async_trait]
impl TelemetrySource for ScriptedSource {
    async fn connect(
        &mut self,
        _endpoint: &SourceEndpoint,
        _credentials: &SourceCredentials,
        _update_interval: Duration,
    ) -> Result<TelemetryReceiver, TelemetryError> {
        let (tx, rx) = mpsc::channel(64);
        let mut senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        senders.push(tx);
        Ok(rx)
    }

    async fn disconnect(&mut self) -> Result<(), TelemetryError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Sender for the `index`-th connection the source has handed out.
pub fn sender_at(
    senders: &Arc<Mutex<Vec<TelemetrySender>>>,
    index: usize,
) -> Option<TelemetrySender> {
    let senders = senders.lock().unwrap_or_else(|e| e.into_inner());
    senders.get(index).cloned()
}

/// Mid-race physics state: quarter tank, on throttle.
pub fn race_physics() -> PhysicsSnapshot {
    PhysicsSnapshot {
        fuel_l: 25.0,
        max_fuel_l: 100.0,
        throttle: 0.9,
        brake: 0.0,
        steering_angle: -4.0,
        ..PhysicsSnapshot::default()
    }
}

/// Thirty minutes of race left, no stint limit, 90s laps at 3L each.
pub fn race_graphics() -> GraphicsSnapshot {
    GraphicsSnapshot {
        fuel_per_lap_l: 3.0,
        fuel_estimated_laps: 10.0,
        best_lap_time_ms: 90_000.0,
        session_time_left_ms: 1_800_000.0,
        stint_time_left_ms: NO_ACTIVE_STINT,
        used_fuel_since_refuel_l: 0.0,
    }
}

pub fn race_static_info() -> StaticInfo {
    StaticInfo {
        car_model: "GT3 Generic".to_string(),
        track_name: "monza".to_string(),
        max_fuel_l: 100.0,
    }
}
