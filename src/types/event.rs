//! Earthquake records

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Region;

/// Earthquake catalogue identifier
pub type QuakeId = u64;

/// A located, timed seismic event. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub quake_id: QuakeId,
    pub latitude: f64,
    pub longitude: f64,
    pub depth_km: f64,
    /// Origin time in local (regulator) time
    pub time_local: NaiveDateTime,
    pub region: Region,
}
