//! Well activity records: HF stages, water disposal, production

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Region;

/// Closed set of well activity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActivityType {
    /// Hydraulic-fracturing stage
    #[serde(rename = "HF")]
    Hf,
    /// Water disposal injection
    #[serde(rename = "WD")]
    Wd,
    /// Production
    #[serde(rename = "PROD")]
    Prod,
}

impl ActivityType {
    pub const ALL: [Self; 3] = [Self::Hf, Self::Wd, Self::Prod];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hf => "HF",
            Self::Wd => "WD",
            Self::Prod => "PROD",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HF" => Ok(Self::Hf),
            "WD" => Ok(Self::Wd),
            "PROD" => Ok(Self::Prod),
            other => Err(format!("unknown activity type '{other}' (expected HF, WD or PROD)")),
        }
    }
}

/// Precision of an HF record.
///
/// A well carries `Present` rows only while it lacks any `Stage` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Exact per-stage (or per-month / per-well point) record
    Stage,
    /// Coarse well-level line approximation
    Present,
}

impl Resolution {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stage => "stage",
            Self::Present => "present",
        }
    }
}

/// Window of potential causal influence.
///
/// For PROD only `inj_start` gates; `inj_end` is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityWindow {
    pub inj_start: NaiveDateTime,
    /// Temporal decay is measured from here (HF / WD)
    pub decay_start: NaiveDateTime,
    pub inj_end: NaiveDateTime,
}

/// A point-located well activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub activity_type: ActivityType,
    /// Frac stage identifier (HF only)
    pub stage_id: Option<String>,
    pub well_id: String,
    pub pad_id: Option<String>,
    /// Target formation category (HF only)
    pub formation: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub depth_km: f64,
    pub window: ActivityWindow,
    pub region: Region,
}

impl Activity {
    /// Pad used for pad-level aggregation. A well without a pad is its own pad.
    pub fn pad_or_well(&self) -> &str {
        self.pad_id.as_deref().unwrap_or(&self.well_id)
    }
}

/// Coarse HF well geometry built from its known segment points.
///
/// Coordinates are `(latitude, longitude)` in geographic degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentLine {
    pub well_id: String,
    pub coords: Vec<(f64, f64)>,
    pub formation: String,
    pub window: ActivityWindow,
}
