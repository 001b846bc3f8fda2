//! Association outputs: candidate links and per-event probability summaries

use serde::{Deserialize, Serialize};

use super::{ActivityType, QuakeId, Region, Resolution};

/// One (event, activity) pair that passed both the spatial and temporal gates.
///
/// Persisted as a row of the link table; `p_stage` is filled in by the
/// aggregator before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateLink {
    pub quake_id: QuakeId,
    pub stage_id: Option<String>,
    pub well_id: String,
    /// Pad (the well id when the activity has no pad)
    pub pad_id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub d_km: f64,
    pub dt_days: f64,
    pub score: f64,
    pub region: Region,
    pub resolution: Resolution,
    #[serde(rename = "P_stage", default)]
    pub p_stage: f64,
}

/// Best-guess attribution for one event at stage, well and pad granularity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilitySummary {
    pub quake_id: QuakeId,
    pub best_stage: Option<String>,
    pub best_stage_prob: f64,
    pub best_well: String,
    pub best_well_type: ActivityType,
    pub best_well_prob: f64,
    pub best_pad: String,
    pub best_pad_prob: f64,
    pub best_d_km: f64,
    pub best_dt_days: f64,
    pub n_hf_wells: u32,
    pub n_wd_wells: u32,
    pub n_prod_wells: u32,
    /// Reserved for per-well metadata; always empty for now
    #[serde(default)]
    pub best_well_target: Option<String>,
    /// Reserved for per-well metadata; always empty for now
    #[serde(default)]
    pub best_well_formation: Option<String>,
}

impl ProbabilitySummary {
    /// Distinct linked wells of the given type
    pub const fn well_count(&self, activity_type: ActivityType) -> u32 {
        match activity_type {
            ActivityType::Hf => self.n_hf_wells,
            ActivityType::Wd => self.n_wd_wells,
            ActivityType::Prod => self.n_prod_wells,
        }
    }
}
