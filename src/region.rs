//! Region classification by strict polygon containment.
//!
//! Every coordinate maps to exactly one region: the first named polygon that
//! strictly contains it, otherwise the default region. Points on a polygon
//! boundary are outside it.

use geo::{coord, Contains, Point, Polygon, Rect};

use crate::types::Region;

/// Kiskatinaw Seismic Monitoring and Mitigation Area envelope (degrees)
const KSMMA_LON: (f64, f64) = (-121.6, -121.0);
const KSMMA_LAT: (f64, f64) = (56.0, 56.25);

#[derive(Debug, Clone)]
pub struct RegionClassifier {
    zones: Vec<(Region, Polygon<f64>)>,
    default_region: Region,
}

impl Default for RegionClassifier {
    fn default() -> Self {
        let ksmma = Rect::new(
            coord! { x: KSMMA_LON.0, y: KSMMA_LAT.0 },
            coord! { x: KSMMA_LON.1, y: KSMMA_LAT.1 },
        )
        .to_polygon();
        Self::new(vec![(Region::Ksmma, ksmma)], Region::NorthernMontney)
    }
}

impl RegionClassifier {
    /// Polygons are tested in order; coordinates are `x = lon`, `y = lat`.
    pub const fn new(zones: Vec<(Region, Polygon<f64>)>, default_region: Region) -> Self {
        Self { zones, default_region }
    }

    pub fn classify(&self, latitude: f64, longitude: f64) -> Region {
        let p = Point::new(longitude, latitude);
        self.zones
            .iter()
            .find(|(_, poly)| poly.contains(&p))
            .map_or(self.default_region, |(region, _)| *region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_envelope_is_ksmma() {
        let c = RegionClassifier::default();
        assert_eq!(c.classify(56.11, -121.31), Region::Ksmma);
    }

    #[test]
    fn test_outside_envelope_is_default() {
        let c = RegionClassifier::default();
        assert_eq!(c.classify(56.5, -121.31), Region::NorthernMontney);
        assert_eq!(c.classify(56.11, -120.5), Region::NorthernMontney);
    }

    #[test]
    fn test_boundary_is_not_contained() {
        let c = RegionClassifier::default();
        assert_eq!(c.classify(56.0, -121.3), Region::NorthernMontney);
        assert_eq!(c.classify(56.1, -121.0), Region::NorthernMontney);
    }
}
