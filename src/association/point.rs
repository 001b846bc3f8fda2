//! Point candidates: great-circle radius search over activity locations

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use super::{temporal, CandidateSource, KernelScorer, SpatialHit};
use crate::geometry::{chord_for_distance, haversine_km, unit_vector};
use crate::types::{Activity, ActivityType, CandidateLink, Event, Resolution};

/// Relative slack on the chord query so rounding never loses an edge hit;
/// the exact haversine filter afterwards restores the true radius.
const CHORD_SLACK: f64 = 1e-9;

/// Activity position on the unit sphere
#[derive(Debug, Clone, Copy)]
struct IndexedActivity {
    index: usize,
    position: [f64; 3],
}

impl RTreeObject for IndexedActivity {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedActivity {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        let dz = self.position[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// One activity type's point locations with their spatial index
pub struct PointSource {
    activity_type: ActivityType,
    activities: Vec<Activity>,
    tree: RTree<IndexedActivity>,
    earth_radius_km: f64,
}

impl PointSource {
    /// Build the index. Rows of another type are dropped.
    pub fn new(activity_type: ActivityType, mut activities: Vec<Activity>, earth_radius_km: f64) -> Self {
        let before = activities.len();
        activities.retain(|a| a.activity_type == activity_type);
        if activities.len() < before {
            tracing::warn!(
                activity_type = %activity_type,
                dropped = before - activities.len(),
                "Dropped activities of a different type from point index"
            );
        }

        let points = activities
            .iter()
            .enumerate()
            .map(|(index, a)| IndexedActivity { index, position: unit_vector(a.latitude, a.longitude) })
            .collect();

        Self {
            activity_type,
            activities,
            tree: RTree::bulk_load(points),
            earth_radius_km,
        }
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }
}

impl CandidateSource for PointSource {
    fn activity_type(&self) -> ActivityType {
        self.activity_type
    }

    fn resolution(&self) -> Resolution {
        Resolution::Stage
    }

    fn len(&self) -> usize {
        self.activities.len()
    }

    fn generate_candidates(&self, event: &Event, radius_km: f64) -> Vec<SpatialHit> {
        let query = unit_vector(event.latitude, event.longitude);
        let chord = chord_for_distance(radius_km, self.earth_radius_km) * (1.0 + CHORD_SLACK);

        let mut hits: Vec<SpatialHit> = self
            .tree
            .locate_within_distance(query, chord * chord)
            .filter_map(|p| {
                let a = &self.activities[p.index];
                let d_km = haversine_km(
                    event.latitude,
                    event.longitude,
                    a.latitude,
                    a.longitude,
                    self.earth_radius_km,
                );
                (d_km <= radius_km).then_some(SpatialHit { index: p.index, d_km })
            })
            .collect();
        hits.sort_by_key(|h| h.index);
        hits
    }

    fn score(&self, event: &Event, hit: SpatialHit, scorer: &KernelScorer<'_>) -> Option<CandidateLink> {
        let a = self.activities.get(hit.index)?;
        let dt_days = temporal::elapsed_days(a.activity_type, &a.window, event.time_local)?;
        let score = scorer.score(a.activity_type, a.formation.as_deref(), event.region, hit.d_km, dt_days);

        Some(CandidateLink {
            quake_id: event.quake_id,
            stage_id: a.stage_id.clone(),
            well_id: a.well_id.clone(),
            pad_id: a.pad_or_well().to_string(),
            activity_type: a.activity_type,
            d_km: hit.d_km,
            dt_days,
            score,
            region: event.region,
            resolution: Resolution::Stage,
            p_stage: 0.0,
        })
    }
}
