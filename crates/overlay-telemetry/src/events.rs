//! Typed event union delivered by a telemetry source.

use serde::{Deserialize, Serialize};

use crate::snapshots::{CarUpdate, GraphicsSnapshot, PhysicsSnapshot, StaticInfo};

/// Outcome of one registration attempt against the broadcast interface.
///
/// Emitted exactly once per connect attempt; immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub connection_id: i32,
    pub success: bool,
    pub readonly: bool,
    pub error: Option<String>,
}

impl ConnectionEvent {
    pub fn succeeded(connection_id: i32, readonly: bool) -> Self {
        Self {
            connection_id,
            success: true,
            readonly,
            error: None,
        }
    }

    pub fn failed(connection_id: i32, error: impl Into<String>) -> Self {
        Self {
            connection_id,
            success: false,
            readonly: true,
            error: Some(error.into()),
        }
    }
}

/// One decoded push from the telemetry source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    Connection(ConnectionEvent),
    Physics(PhysicsSnapshot),
    Graphics(GraphicsSnapshot),
    Static(StaticInfo),
    Car(CarUpdate),
}

/// Subscription key for one category of [`TelemetryEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Connection,
    Physics,
    Graphics,
    Static,
    Car,
}

impl TelemetryEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TelemetryEvent::Connection(_) => EventKind::Connection,
            TelemetryEvent::Physics(_) => EventKind::Physics,
            TelemetryEvent::Graphics(_) => EventKind::Graphics,
            TelemetryEvent::Static(_) => EventKind::Static,
            TelemetryEvent::Car(_) => EventKind::Car,
        }
    }
}
