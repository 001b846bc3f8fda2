//! Line candidates: coarse HF wells as projected polylines.
//!
//! Each event is matched with its own square envelope query against an
//! R-tree of line bounding boxes; the exact point-to-line distance then trims
//! the corners. This per-event loop is the main cost of a large run.

use geo::{Coord, EuclideanDistance, LineString};
use rstar::{RTree, RTreeObject, AABB};

use super::{temporal, CandidateSource, KernelScorer, SpatialHit};
use crate::geometry::to_plane;
use crate::types::{ActivityType, ActivityWindow, CandidateLink, Event, PresentLine, Resolution};

#[derive(Debug, Clone)]
struct ProjectedLine {
    well_id: String,
    formation: String,
    window: ActivityWindow,
    geometry: LineString<f64>,
}

/// Bounding box of one projected line (metres)
#[derive(Debug, Clone, Copy)]
struct IndexedLine {
    index: usize,
    bbox: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedLine {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bbox
    }
}

pub struct LineSource {
    lines: Vec<ProjectedLine>,
    tree: RTree<IndexedLine>,
}

impl LineSource {
    /// Project every line into the metric plane. A single-point well becomes a
    /// zero-length segment; a well with no coordinates is skipped.
    pub fn new(present: Vec<PresentLine>) -> Self {
        let mut lines = Vec::with_capacity(present.len());
        for line in present {
            let mut coords: Vec<Coord<f64>> = line
                .coords
                .iter()
                .map(|&(lat, lon)| to_plane(lat, lon).into())
                .collect();
            match coords.len() {
                0 => {
                    tracing::warn!(well_id = %line.well_id, "Present line has no coordinates, skipping");
                    continue;
                }
                1 => coords.push(coords[0]),
                _ => {}
            }
            lines.push(ProjectedLine {
                well_id: line.well_id,
                formation: line.formation,
                window: line.window,
                geometry: LineString::new(coords),
            });
        }

        let boxes = lines
            .iter()
            .enumerate()
            .map(|(index, l)| IndexedLine { index, bbox: bounding_box(&l.geometry) })
            .collect();

        Self { lines, tree: RTree::bulk_load(boxes) }
    }
}

fn bounding_box(line: &LineString<f64>) -> AABB<[f64; 2]> {
    let points: Vec<[f64; 2]> = line.coords().map(|c| [c.x, c.y]).collect();
    AABB::from_points(points.iter())
}

impl CandidateSource for LineSource {
    fn activity_type(&self) -> ActivityType {
        ActivityType::Hf
    }

    fn resolution(&self) -> Resolution {
        Resolution::Present
    }

    fn len(&self) -> usize {
        self.lines.len()
    }

    fn generate_candidates(&self, event: &Event, radius_km: f64) -> Vec<SpatialHit> {
        let p = to_plane(event.latitude, event.longitude);
        let radius_m = radius_km * 1000.0;
        let search = AABB::from_corners(
            [p.x() - radius_m, p.y() - radius_m],
            [p.x() + radius_m, p.y() + radius_m],
        );

        let mut hits: Vec<SpatialHit> = self
            .tree
            .locate_in_envelope_intersecting(&search)
            .filter_map(|b| {
                let d_m = p.euclidean_distance(&self.lines[b.index].geometry);
                (d_m <= radius_m).then_some(SpatialHit { index: b.index, d_km: d_m / 1000.0 })
            })
            .collect();
        hits.sort_by_key(|h| h.index);
        hits
    }

    fn score(&self, event: &Event, hit: SpatialHit, scorer: &KernelScorer<'_>) -> Option<CandidateLink> {
        let line = self.lines.get(hit.index)?;
        let dt_days = temporal::elapsed_days(ActivityType::Hf, &line.window, event.time_local)?;
        let score = scorer.score(ActivityType::Hf, Some(&line.formation), event.region, hit.d_km, dt_days);

        Some(CandidateLink {
            quake_id: event.quake_id,
            stage_id: None,
            well_id: line.well_id.clone(),
            pad_id: line.well_id.clone(),
            activity_type: ActivityType::Hf,
            d_km: hit.d_km,
            dt_days,
            score,
            region: event.region,
            resolution: Resolution::Present,
            p_stage: 0.0,
        })
    }
}
