//! Candidate generation and scoring.
//!
//! Every activity representation (points per type, HF present lines) sits
//! behind [`CandidateSource`]: a spatial query producing raw hits, and a
//! scoring step applying the temporal gate and kernels. [`Associator`]
//! composes the sources for the enabled types.

pub mod kernel;
pub mod line;
pub mod point;
pub mod temporal;

use std::collections::BTreeSet;

use tracing::debug;

pub use kernel::KernelScorer;
pub use line::LineSource;
pub use point::PointSource;

use crate::config::AssocConfig;
use crate::types::{Activity, ActivityType, CandidateLink, Event, PresentLine, Resolution};

/// A spatial match: index of the activity within its source, and distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialHit {
    pub index: usize,
    pub d_km: f64,
}

pub trait CandidateSource {
    fn activity_type(&self) -> ActivityType;

    fn resolution(&self) -> Resolution;

    /// Number of indexed activities
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every activity within `radius_km` of the event, ordered by index.
    fn generate_candidates(&self, event: &Event, radius_km: f64) -> Vec<SpatialHit>;

    /// Gate a hit on time and score it. `None` when the event is outside the
    /// activity's window.
    fn score(&self, event: &Event, hit: SpatialHit, scorer: &KernelScorer<'_>) -> Option<CandidateLink>;

    /// Candidate links for a batch of events, in event then activity order.
    fn associate(&self, events: &[Event], scorer: &KernelScorer<'_>) -> Vec<CandidateLink> {
        if self.is_empty() {
            return Vec::new();
        }
        let radii = scorer.config().radius_km.for_type(self.activity_type());
        let mut links = Vec::new();
        for event in events {
            for hit in self.generate_candidates(event, radii.get(event.region)) {
                if let Some(link) = self.score(event, hit, scorer) {
                    links.push(link);
                }
            }
        }
        links
    }
}

/// Normalised activity inputs for one run
#[derive(Debug, Clone, Default)]
pub struct ActivitySet {
    pub hf_stage: Vec<Activity>,
    pub hf_present: Vec<PresentLine>,
    pub wd: Vec<Activity>,
    pub prod: Vec<Activity>,
}

impl ActivitySet {
    /// Wells that have stage-resolution HF data
    pub fn stage_wells(&self) -> BTreeSet<String> {
        self.hf_stage.iter().map(|a| a.well_id.clone()).collect()
    }

    /// Enforce that a well carries present rows only while it has no stage rows.
    /// Returns the number of present lines removed.
    pub fn drop_superseded_present(&mut self) -> usize {
        let stage_wells = self.stage_wells();
        let before = self.hf_present.len();
        self.hf_present.retain(|l| !stage_wells.contains(&l.well_id));
        before - self.hf_present.len()
    }

    /// Restrict HF inputs to a single well being re-associated: its stage rows
    /// are removed and only its present line is kept.
    pub fn retarget_well(&mut self, well_id: &str) {
        self.hf_stage.retain(|a| a.well_id != well_id);
        self.hf_present.retain(|l| l.well_id == well_id);
    }
}

/// The enabled candidate sources, in link order: HF stage, HF present, WD, PROD
pub struct Associator {
    sources: Vec<Box<dyn CandidateSource>>,
}

impl std::fmt::Debug for Associator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|s| (s.activity_type(), s.resolution(), s.len())))
            .finish()
    }
}

impl Associator {
    /// Index the inputs of every enabled type. Disabled types build nothing.
    pub fn build(activities: ActivitySet, config: &AssocConfig) -> Self {
        let earth_radius_km = config.kernel.earth_radius_km;
        let ActivitySet { hf_stage, hf_present, wd, prod } = activities;
        let mut sources: Vec<Box<dyn CandidateSource>> = Vec::new();

        if config.type_enabled(ActivityType::Hf) {
            sources.push(Box::new(PointSource::new(ActivityType::Hf, hf_stage, earth_radius_km)));
            sources.push(Box::new(LineSource::new(hf_present)));
        }
        if config.type_enabled(ActivityType::Wd) {
            sources.push(Box::new(PointSource::new(ActivityType::Wd, wd, earth_radius_km)));
        }
        if config.type_enabled(ActivityType::Prod) {
            sources.push(Box::new(PointSource::new(ActivityType::Prod, prod, earth_radius_km)));
        }

        for s in &sources {
            debug!(activity_type = %s.activity_type(), resolution = s.resolution().as_str(), rows = s.len(), "Indexed candidate source");
        }
        Self { sources }
    }

    /// Candidate links from every source for a batch of events
    pub fn associate(&self, events: &[Event], config: &AssocConfig) -> Vec<CandidateLink> {
        let scorer = KernelScorer::new(config);
        let mut links = Vec::new();
        for source in &self.sources {
            let found = source.associate(events, &scorer);
            debug!(
                activity_type = %source.activity_type(),
                resolution = source.resolution().as_str(),
                candidates = found.len(),
                "Scored candidates"
            );
            links.extend(found);
        }
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityWindow, Region};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn window() -> ActivityWindow {
        ActivityWindow { inj_start: at(2022, 1, 1), decay_start: at(2022, 1, 1), inj_end: at(2024, 1, 1) }
    }

    fn point(t: ActivityType, well: &str) -> Activity {
        Activity {
            activity_type: t,
            stage_id: (t == ActivityType::Hf).then(|| format!("{well}-1")),
            well_id: well.to_string(),
            pad_id: None,
            formation: None,
            latitude: 56.3,
            longitude: -120.8,
            depth_km: 2.0,
            window: window(),
            region: Region::NorthernMontney,
        }
    }

    fn line(well: &str) -> PresentLine {
        PresentLine { well_id: well.to_string(), coords: vec![(56.3, -120.8)], formation: "Other".into(), window: window() }
    }

    fn inputs() -> ActivitySet {
        ActivitySet {
            hf_stage: vec![point(ActivityType::Hf, "H1")],
            hf_present: vec![line("H1"), line("H2")],
            wd: vec![point(ActivityType::Wd, "D1")],
            prod: vec![point(ActivityType::Prod, "P1")],
        }
    }

    fn quake() -> Event {
        Event {
            quake_id: 1,
            latitude: 56.3,
            longitude: -120.8,
            depth_km: 2.5,
            time_local: at(2023, 1, 1),
            region: Region::NorthernMontney,
        }
    }

    #[test]
    fn test_superseded_present_lines_are_dropped() {
        let mut set = inputs();
        assert_eq!(set.drop_superseded_present(), 1);
        assert_eq!(set.hf_present.len(), 1);
        assert_eq!(set.hf_present[0].well_id, "H2");
    }

    #[test]
    fn test_links_follow_source_order() {
        let config = AssocConfig::default();
        let mut set = inputs();
        set.drop_superseded_present();
        let links = Associator::build(set, &config).associate(&[quake()], &config);
        let order: Vec<(ActivityType, Resolution, &str)> =
            links.iter().map(|l| (l.activity_type, l.resolution, l.well_id.as_str())).collect();
        assert_eq!(
            order,
            vec![
                (ActivityType::Hf, Resolution::Stage, "H1"),
                (ActivityType::Hf, Resolution::Present, "H2"),
                (ActivityType::Wd, Resolution::Stage, "D1"),
                (ActivityType::Prod, Resolution::Stage, "P1"),
            ]
        );
    }

    #[test]
    fn test_disabled_types_produce_no_links() {
        let mut config = AssocConfig::default();
        config.run.types = vec![ActivityType::Wd];
        let links = Associator::build(inputs(), &config).associate(&[quake()], &config);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].activity_type, ActivityType::Wd);
    }

    #[test]
    fn test_retarget_well() {
        let mut set = inputs();
        set.retarget_well("H1");
        assert!(set.hf_stage.is_empty());
        assert_eq!(set.hf_present.len(), 1);
        assert_eq!(set.hf_present[0].well_id, "H1");
    }
}
