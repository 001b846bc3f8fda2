//! Forward Transverse Mercator for NAD83 / UTM zone 10N (EPSG:26910).
//!
//! Snyder, "Map Projections: A Working Manual", eqs. 8-9 to 8-13, on the
//! GRS80 ellipsoid. Accurate to well under a metre inside the zone, which is
//! far below the kilometre-scale search radii.

use geo::Point;

use crate::config::defaults::PLANE_UTM_ZONE;

const SEMI_MAJOR_M: f64 = 6_378_137.0;
const INV_FLATTENING: f64 = 298.257_222_101;
const SCALE_FACTOR: f64 = 0.9996;
const FALSE_EASTING_M: f64 = 500_000.0;

/// Central meridian of a UTM zone in degrees
fn central_meridian_deg(zone: u8) -> f64 {
    f64::from(zone).mul_add(6.0, -183.0)
}

/// Project geographic degrees into the metric plane. `x` is easting, `y` northing.
pub fn to_plane(lat_deg: f64, lon_deg: f64) -> Point<f64> {
    let f = 1.0 / INV_FLATTENING;
    let e2 = f * (2.0 - f);
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let ep2 = e2 / (1.0 - e2);

    let phi = lat_deg.to_radians();
    let dlambda = (lon_deg - central_meridian_deg(PLANE_UTM_ZONE)).to_radians();

    let (sin_phi, cos_phi) = phi.sin_cos();
    let tan_phi = phi.tan();

    let n = SEMI_MAJOR_M / e2.mul_add(-sin_phi * sin_phi, 1.0).sqrt();
    let t = tan_phi * tan_phi;
    let c = ep2 * cos_phi * cos_phi;
    let a = dlambda * cos_phi;

    let m = SEMI_MAJOR_M
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin());

    let a2 = a * a;
    let a3 = a2 * a;
    let a4 = a3 * a;
    let a5 = a4 * a;
    let a6 = a5 * a;

    let x = SCALE_FACTOR
        * n
        * (a + (1.0 - t + c) * a3 / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0)
        + FALSE_EASTING_M;

    let y = SCALE_FACTOR
        * (m + n
            * tan_phi
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

    Point::new(x, y)
}
