//! Latest-snapshot cache for pull consumers.
//!
//! Overlays read at their own cadence; the cache always returns an owned
//! copy of the most recent value so readers never race the delivery path.

use std::sync::Mutex;

use openoverlay_telemetry::{
    ConnectionEvent, GraphicsSnapshot, PhysicsSnapshot, StaticInfo, TelemetryEvent,
};

#[derive(Default)]
pub struct SnapshotCache {
    connection: Mutex<Option<ConnectionEvent>>,
    physics: Mutex<Option<PhysicsSnapshot>>,
    graphics: Mutex<Option<GraphicsSnapshot>>,
    static_info: Mutex<Option<StaticInfo>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn update(&self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::Connection(connection) => {
                let mut slot = self.connection.lock().unwrap_or_else(|e| e.into_inner());
                *slot = Some(connection.clone());
            }
            TelemetryEvent::Physics(physics) => {
                let mut slot = self.physics.lock().unwrap_or_else(|e| e.into_inner());
                *slot = Some(physics.clone());
            }
            TelemetryEvent::Graphics(graphics) => {
                let mut slot = self.graphics.lock().unwrap_or_else(|e| e.into_inner());
                *slot = Some(graphics.clone());
            }
            TelemetryEvent::Static(static_info) => {
                let mut slot = self.static_info.lock().unwrap_or_else(|e| e.into_inner());
                *slot = Some(static_info.clone());
            }
            // Per-car updates are fan-out only; no overlay pulls them.
            TelemetryEvent::Car(_) => {}
        }
    }

    pub(crate) fn clear(&self) {
        *self.connection.lock().unwrap_or_else(|e| e.into_inner()) = None;
        *self.physics.lock().unwrap_or_else(|e| e.into_inner()) = None;
        *self.graphics.lock().unwrap_or_else(|e| e.into_inner()) = None;
        *self.static_info.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn latest_connection(&self) -> Option<ConnectionEvent> {
        self.connection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn latest_physics(&self) -> Option<PhysicsSnapshot> {
        self.physics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn latest_graphics(&self) -> Option<GraphicsSnapshot> {
        self.graphics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn latest_static(&self) -> Option<StaticInfo> {
        self.static_info
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
