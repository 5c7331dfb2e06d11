//! Persistence collaborator contract.
//!
//! Lap and telemetry history live outside this process; the overlay core only
//! queries them. The store hands back time-ordered records and never leaks its
//! on-disk format through this seam.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::snapshots::PhysicsSnapshot;
use crate::TelemetryError;

/// Summary row for one completed lap in a stored session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapSummary {
    /// 1-based lap number within the session.
    pub lap_number: u32,
    /// Wall-clock lap time in milliseconds.
    pub lap_time_ms: f64,
    /// Fuel burned over the lap, in litres.
    pub fuel_used_l: f64,
    /// Whether the lap completed without cuts or resets.
    pub valid: bool,
}

/// Read-only access to stored session and lap telemetry.
///
/// Keys of the returned maps are sample indices in capture order; `BTreeMap`
/// iteration therefore replays samples in time order.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// All laps recorded for a session, ordered by lap number.
    async fn laps_for_session(&self, session_id: &str) -> Result<Vec<LapSummary>, TelemetryError>;

    /// Per-sample telemetry for one lap of a session.
    async fn telemetry_for_lap(
        &self,
        session_id: &str,
        lap_number: u32,
    ) -> Result<BTreeMap<u64, PhysicsSnapshot>, TelemetryError>;
}
