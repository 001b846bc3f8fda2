//! Geodesy helpers shared by the candidate generators.
//!
//! Two coordinate systems are in play: geographic degrees on a sphere for
//! point candidates, and a projected metric plane for line candidates.

pub mod projection;

pub use projection::to_plane;

/// Unit-sphere Cartesian coordinates for a geographic position.
///
/// Straight-line (chord) distance between two such vectors is monotonic in
/// great-circle distance, which lets a Euclidean R-tree answer radius queries
/// on the sphere.
pub fn unit_vector(lat_deg: f64, lon_deg: f64) -> [f64; 3] {
    let (lat, lon) = (lat_deg.to_radians(), lon_deg.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// Chord length on the unit sphere subtending a surface distance of `d_km`.
pub fn chord_for_distance(d_km: f64, earth_radius_km: f64) -> f64 {
    let theta = (d_km / earth_radius_km).clamp(0.0, std::f64::consts::PI);
    2.0 * (theta / 2.0).sin()
}

/// Great-circle distance in km (haversine).
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64, earth_radius_km: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = phi2 - phi1;
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * earth_radius_km * a.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: f64 = 6371.0;

    #[test]
    fn test_haversine_zero_for_same_point() {
        assert_eq!(haversine_km(56.11, -121.31, 56.11, -121.31, R), 0.0);
    }

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        let d = haversine_km(56.0, -121.0, 57.0, -121.0, R);
        assert!((d - 111.195).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_chord_matches_unit_vector_separation() {
        let a = unit_vector(56.0, -121.0);
        let b = unit_vector(56.05, -121.08);
        let chord = ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt();
        let d = haversine_km(56.0, -121.0, 56.05, -121.08, R);
        assert!((chord - chord_for_distance(d, R)).abs() < 1e-12);
    }

    #[test]
    fn test_chord_saturates_at_antipode() {
        assert!((chord_for_distance(1.0e9, R) - 2.0).abs() < 1e-12);
    }
}
