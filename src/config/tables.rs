//! Typed lookup tables keyed by activity type and region.
//!
//! Every `(type, region)` pair must be present: a partially written table is a
//! parse error rather than a silent default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::defaults::{FALLBACK_FORMATION, FALLBACK_FORMATION_WEIGHT, FAVOURED_FORMATION};
use crate::types::{ActivityType, Region};

// ============================================================================
// Search radii
// ============================================================================

/// Search radius (km) for each region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionRadii {
    #[serde(rename = "KSMMA")]
    pub ksmma: f64,
    #[serde(rename = "Northern Montney")]
    pub northern_montney: f64,
}

impl RegionRadii {
    pub const fn new(ksmma: f64, northern_montney: f64) -> Self {
        Self { ksmma, northern_montney }
    }

    pub const fn get(&self, region: Region) -> f64 {
        match region {
            Region::Ksmma => self.ksmma,
            Region::NorthernMontney => self.northern_montney,
        }
    }

    /// Largest radius over all regions
    pub fn max(&self) -> f64 {
        self.ksmma.max(self.northern_montney)
    }
}

/// `radius_km[type][region]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RadiusTable {
    #[serde(rename = "HF", default = "default_hf_radii")]
    pub hf: RegionRadii,
    #[serde(rename = "WD", default = "default_wd_radii")]
    pub wd: RegionRadii,
    #[serde(rename = "PROD", default = "default_prod_radii")]
    pub prod: RegionRadii,
}

fn default_hf_radii() -> RegionRadii { RegionRadii::new(1.0, 3.0) }
fn default_wd_radii() -> RegionRadii { RegionRadii::new(5.0, 10.0) }
fn default_prod_radii() -> RegionRadii { RegionRadii::new(1.0, 3.0) }

impl Default for RadiusTable {
    fn default() -> Self {
        Self {
            hf: default_hf_radii(),
            wd: default_wd_radii(),
            prod: default_prod_radii(),
        }
    }
}

impl RadiusTable {
    pub const fn for_type(&self, activity_type: ActivityType) -> &RegionRadii {
        match activity_type {
            ActivityType::Hf => &self.hf,
            ActivityType::Wd => &self.wd,
            ActivityType::Prod => &self.prod,
        }
    }

    /// Radius in km for an activity type within a region
    pub const fn get(&self, activity_type: ActivityType, region: Region) -> f64 {
        self.for_type(activity_type).get(region)
    }

    /// Same radius for every pair, handy for generous exploratory runs
    pub const fn uniform(radius_km: f64) -> Self {
        let r = RegionRadii::new(radius_km, radius_km);
        Self { hf: r, wd: r, prod: r }
    }

    pub(crate) fn check(&self, errors: &mut Vec<String>) {
        for t in ActivityType::ALL {
            for region in Region::ALL {
                let r = self.get(t, region);
                if !r.is_finite() || r <= 0.0 {
                    errors.push(format!(
                        "radius_km.{t}.\"{region}\" must be a positive finite number (got {r})"
                    ));
                }
            }
        }
    }
}

// ============================================================================
// Weights
// ============================================================================

/// Type weights and the HF formation sub-weight table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    #[serde(default = "default_hf_weight")]
    pub hf: f64,

    #[serde(default = "default_wd_weight")]
    pub wd: f64,

    #[serde(default = "default_prod_weight")]
    pub prod: f64,

    /// Formation category -> weight (HF only)
    #[serde(default = "default_formation_weights")]
    pub formation: BTreeMap<String, f64>,

    /// Category used for unrecognised formations. Must be a key of `formation`.
    #[serde(default = "default_formation_fallback")]
    pub formation_fallback: String,
}

fn default_hf_weight() -> f64 { 0.9 }
fn default_wd_weight() -> f64 { 0.1 }
fn default_prod_weight() -> f64 { 0.05 }
fn default_formation_fallback() -> String { FALLBACK_FORMATION.to_string() }

fn default_formation_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([
        (FAVOURED_FORMATION.to_string(), 0.8),
        (FALLBACK_FORMATION.to_string(), FALLBACK_FORMATION_WEIGHT),
    ])
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            hf: default_hf_weight(),
            wd: default_wd_weight(),
            prod: default_prod_weight(),
            formation: default_formation_weights(),
            formation_fallback: default_formation_fallback(),
        }
    }
}

impl WeightConfig {
    pub const fn type_weight(&self, activity_type: ActivityType) -> f64 {
        match activity_type {
            ActivityType::Hf => self.hf,
            ActivityType::Wd => self.wd,
            ActivityType::Prod => self.prod,
        }
    }

    /// Formation sub-weight; unknown or missing formations take the fallback category
    pub fn formation_weight(&self, formation: Option<&str>) -> f64 {
        formation
            .and_then(|f| self.formation.get(f))
            .or_else(|| self.formation.get(&self.formation_fallback))
            .copied()
            .unwrap_or(FALLBACK_FORMATION_WEIGHT)
    }

    pub(crate) fn check(&self, errors: &mut Vec<String>) {
        for t in ActivityType::ALL {
            let w = self.type_weight(t);
            if !w.is_finite() || w < 0.0 {
                errors.push(format!("weights.{} must be finite and >= 0 (got {w})", t.as_str().to_lowercase()));
            }
        }
        for (name, w) in &self.formation {
            if !w.is_finite() || *w < 0.0 {
                errors.push(format!("weights.formation.\"{name}\" must be finite and >= 0 (got {w})"));
            }
        }
        if !self.formation.contains_key(&self.formation_fallback) {
            errors.push(format!(
                "weights.formation_fallback '{}' is not a key of weights.formation",
                self.formation_fallback
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_lookup_by_type_and_region() {
        let t = RadiusTable::default();
        assert_eq!(t.get(ActivityType::Hf, Region::Ksmma), 1.0);
        assert_eq!(t.get(ActivityType::Hf, Region::NorthernMontney), 3.0);
        assert_eq!(t.get(ActivityType::Wd, Region::NorthernMontney), 10.0);
        assert_eq!(t.get(ActivityType::Prod, Region::Ksmma), 1.0);
    }

    #[test]
    fn test_partial_region_table_is_rejected() {
        let result: Result<RadiusTable, _> = toml::from_str(
            r#"
[HF]
KSMMA = 2.0
"#,
        );
        assert!(result.is_err(), "HF without 'Northern Montney' must not parse");
    }

    #[test]
    fn test_unknown_region_is_rejected() {
        let result: Result<RadiusTable, _> = toml::from_str(
            r#"
[WD]
KSMMA = 2.0
"Northern Montney" = 4.0
Duvernay = 3.0
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_formation_weight_fallback() {
        let w = WeightConfig::default();
        assert_eq!(w.formation_weight(Some("Lower Middle Montney")), 0.8);
        assert_eq!(w.formation_weight(Some("Upper Montney")), 0.2);
        assert_eq!(w.formation_weight(None), 0.2);
    }

    #[test]
    fn test_missing_fallback_category_is_an_error() {
        let mut w = WeightConfig::default();
        w.formation_fallback = "Catch-all".to_string();
        let mut errors = Vec::new();
        w.check(&mut errors);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("formation_fallback"));
    }
}
