//! Telemetry domain model and source contract for OpenOverlay.
//!
//! This crate holds the decoded broadcast payloads (snapshots, connection
//! events), the async `TelemetrySource` contract the hub consumes, and the
//! shared error taxonomy.
//!
//! ## Modules
//! - `snapshots` - Decoded telemetry payloads (`PhysicsSnapshot`, `GraphicsSnapshot`, etc.)
//! - `events` - `TelemetryEvent` union and per-kind classification
//! - `clamp` - Pure numeric clamp helpers
//! - `store` - Contract for the external lap/session persistence service

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

pub mod clamp;
pub mod events;
pub mod snapshots;
pub mod store;

pub use clamp::{clamp_max, clamp_min};
pub use events::{ConnectionEvent, EventKind, TelemetryEvent};
pub use snapshots::{
    CarUpdate, GraphicsSnapshot, NO_ACTIVE_STINT, PhysicsSnapshot, StaticInfo, WheelSet,
};
pub use store::{LapSummary, SessionStore};

/// Default broadcast endpoint port used by the simulator.
pub const DEFAULT_BROADCAST_PORT: u16 = 9000;

/// Default update interval requested at registration.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(100);

/// Receiving half of a source's event stream.
pub type TelemetryReceiver = mpsc::Receiver<TelemetryEvent>;
pub type TelemetrySender = mpsc::Sender<TelemetryEvent>;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to connect to telemetry source: {0}")]
    ConnectionFailed(String),

    #[error("Source is not connected")]
    NotConnected,

    #[error("Source event stream closed")]
    SourceClosed,

    #[error("Invalid configuration: {field} = {value} (valid range {range})")]
    InvalidConfig {
        field: &'static str,
        value: String,
        range: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the simulator's broadcast interface listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEndpoint {
    pub host: String,
    pub port: u16,
}

impl SourceEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Local simulator instance on the default broadcast port.
    pub fn localhost() -> Self {
        Self::new("127.0.0.1", DEFAULT_BROADCAST_PORT)
    }
}

/// Registration credentials for the broadcast protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCredentials {
    pub display_name: String,
    pub connection_password: String,
    pub command_password: String,
}

impl SourceCredentials {
    pub fn with_display_name(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Self::default()
        }
    }
}

/// Contract for a connection to the simulator's telemetry feed.
///
/// A source delivers already-decoded payloads over the returned receiver;
/// wire parsing happens below this seam. Implementations must tolerate
/// `disconnect` without a prior `connect`.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Open the connection and begin delivering events.
    ///
    /// The outcome of the registration attempt arrives asynchronously as a
    /// [`ConnectionEvent`] on the returned stream; `Ok` here only means the
    /// transport-level attempt was made.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::ConnectionFailed`] when the transport
    /// cannot even be opened (e.g. socket bind failure).
    async fn connect(
        &mut self,
        endpoint: &SourceEndpoint,
        credentials: &SourceCredentials,
        update_interval: Duration,
    ) -> Result<TelemetryReceiver, TelemetryError>;

    /// Tear the connection down. Must be a no-op when not connected.
    async fn disconnect(&mut self) -> Result<(), TelemetryError>;
}
