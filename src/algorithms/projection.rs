//! Coordinate transformations between geographic lon/lat and the
//! projected frames the location statistics need: geocentric Cartesian
//! (centroid and covariance), cylindrical equal-area (true area) and
//! azimuthal equidistant (distance-bounded disks, nearest-cell search).
//!
//! All projections are on the WGS84 ellipsoid and hold nothing but
//! precomputed parameters, so they are cheap to build and share.

use geo::{Coord, MapCoords, Polygon};
use nalgebra::Vector3;

use crate::algorithms::geodesy::{Ellipsoid, WGS84};
use crate::core::GeoPoint;

/// Geocentric (ECEF) Cartesian coordinates in meters
#[derive(Debug, Clone, Copy)]
pub struct Geocentric {
    ellipsoid: Ellipsoid,
}

impl Default for Geocentric {
    fn default() -> Self {
        Self { ellipsoid: WGS84 }
    }
}

impl Geocentric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a surface point (height 0) to ECEF
    pub fn forward(&self, point: GeoPoint) -> Vector3<f64> {
        let e = &self.ellipsoid;
        let (sin_lat, cos_lat) = point.lat.to_radians().sin_cos();
        let (sin_lon, cos_lon) = point.lon.to_radians().sin_cos();

        // Radius of curvature in the prime vertical
        let n = e.a / (1.0 - e.e2 * sin_lat * sin_lat).sqrt();

        Vector3::new(
            n * cos_lat * cos_lon,
            n * cos_lat * sin_lon,
            n * (1.0 - e.e2) * sin_lat,
        )
    }

    /// Convert ECEF back to lon/lat, discarding height (Bowring's method)
    pub fn inverse(&self, ecef: &Vector3<f64>) -> GeoPoint {
        let e = &self.ellipsoid;
        let ep2 = (e.a * e.a - e.b * e.b) / (e.b * e.b);
        let p = (ecef.x * ecef.x + ecef.y * ecef.y).sqrt();
        let theta = (ecef.z * e.a).atan2(p * e.b);
        let (sin_t, cos_t) = theta.sin_cos();

        let lat = (ecef.z + ep2 * e.b * sin_t * sin_t * sin_t)
            .atan2(p - e.e2 * e.a * cos_t * cos_t * cos_t);
        let lon = ecef.y.atan2(ecef.x);

        GeoPoint::new(lon.to_degrees(), lat.to_degrees())
    }
}

/// Cylindrical equal-area projection, lon_0 = 0, lat_ts = 0
#[derive(Debug, Clone, Copy)]
pub struct CylindricalEqualArea {
    ellipsoid: Ellipsoid,
    e: f64,
}

impl Default for CylindricalEqualArea {
    fn default() -> Self {
        Self { ellipsoid: WGS84, e: WGS84.e2.sqrt() }
    }
}

impl CylindricalEqualArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authalic function q(phi) as a function of sin(phi)
    fn q(&self, sin_phi: f64) -> f64 {
        let e = self.e;
        let e2 = self.ellipsoid.e2;
        let es = e * sin_phi;
        (1.0 - e2) * (sin_phi / (1.0 - es * es) - (1.0 / (2.0 * e)) * ((1.0 - es) / (1.0 + es)).ln())
    }

    pub fn forward(&self, point: GeoPoint) -> (f64, f64) {
        let a = self.ellipsoid.a;
        let x = a * point.lon.to_radians();
        let y = a * self.q(point.lat.to_radians().sin()) / 2.0;
        (x, y)
    }

    /// True area (m^2) of the lat/lon rectangle spanning `width` degrees of
    /// longitude between latitudes `south` and `north`. Parallels and
    /// meridians are straight lines in this projection, so the projected
    /// rectangle is exact.
    pub fn rectangle_area(&self, width: f64, south: f64, north: f64) -> f64 {
        let (x0, y0) = self.forward(GeoPoint::new(0.0, south));
        let (x1, y1) = self.forward(GeoPoint::new(width, north));
        ((x1 - x0) * (y1 - y0)).abs()
    }
}

/// Azimuthal equidistant projection centered on an arbitrary point.
///
/// Distance from the origin of the projected plane equals the geodesic
/// distance from the center.
#[derive(Debug, Clone, Copy)]
pub struct AzimuthalEquidistant {
    center: GeoPoint,
    ellipsoid: Ellipsoid,
}

impl AzimuthalEquidistant {
    pub fn new(center: GeoPoint) -> Self {
        Self { center, ellipsoid: WGS84 }
    }

    pub fn forward(&self, point: GeoPoint) -> (f64, f64) {
        let inv = self.ellipsoid.inverse(self.center, point);
        let (sin_az, cos_az) = inv.azimuth1.to_radians().sin_cos();
        (inv.distance * sin_az, inv.distance * cos_az)
    }

    pub fn inverse(&self, x: f64, y: f64) -> GeoPoint {
        let distance = x.hypot(y);
        if distance == 0.0 {
            return self.center;
        }
        let azimuth = x.atan2(y).to_degrees();
        self.ellipsoid.direct(self.center, azimuth, distance).point
    }

    /// Polygon approximating a disk of `radius` meters around the origin
    /// of the projected plane, i.e. a buffered point
    pub fn disk(&self, radius: f64, vertices: usize) -> Polygon<f64> {
        let mut ring: Vec<Coord<f64>> = (0..vertices)
            .map(|k| {
                let theta = std::f64::consts::TAU * k as f64 / vertices as f64;
                Coord { x: radius * theta.cos(), y: radius * theta.sin() }
            })
            .collect();
        if let Some(first) = ring.first().copied() {
            ring.push(first);
        }
        Polygon::new(ring.into(), vec![])
    }

    /// Reproject a polygon from this projection back to lon/lat
    pub fn polygon_to_geographic(&self, polygon: &Polygon<f64>) -> Polygon<f64> {
        polygon.map_coords(|c| {
            let p = self.inverse(c.x, c.y);
            Coord { x: p.lon, y: p.lat }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geocentric_equator() {
        let ecef = Geocentric::new().forward(GeoPoint::new(0.0, 0.0));
        assert!((ecef.x - WGS84.a).abs() < 1e-6);
        assert!(ecef.y.abs() < 1e-6);
        assert!(ecef.z.abs() < 1e-6);
    }

    #[test]
    fn test_geocentric_pole() {
        let ecef = Geocentric::new().forward(GeoPoint::new(0.0, 90.0));
        assert!(ecef.x.abs() < 1e-6);
        assert!((ecef.z - WGS84.b).abs() < 1e-6);
    }

    #[test]
    fn test_geocentric_roundtrip() {
        let g = Geocentric::new();
        for &(lon, lat) in &[(10.0, 20.0), (-120.5, -45.25), (179.9, 89.0)] {
            let back = g.inverse(&g.forward(GeoPoint::new(lon, lat)));
            assert!((back.lon - lon).abs() < 1e-8);
            assert!((back.lat - lat).abs() < 1e-8);
        }
    }

    #[test]
    fn test_geocentric_inverse_below_surface() {
        // Points scaled toward the center keep their direction
        let g = Geocentric::new();
        let ecef = g.forward(GeoPoint::new(30.0, 0.0)) * 0.5;
        let p = g.inverse(&ecef);
        assert!((p.lon - 30.0).abs() < 1e-9);
        assert!(p.lat.abs() < 1e-9);
    }

    #[test]
    fn test_cea_total_area() {
        // Surface area of the WGS84 ellipsoid is about 5.10066e14 m^2
        let area = CylindricalEqualArea::new().rectangle_area(360.0, -90.0, 90.0);
        assert!((area - 5.10066e14).abs() / 5.10066e14 < 1e-5);
    }

    #[test]
    fn test_aeqd_distance_is_geodesic() {
        let center = GeoPoint::new(10.0, 20.0);
        let aeqd = AzimuthalEquidistant::new(center);
        let target = GeoPoint::new(12.0, 21.0);
        let (x, y) = aeqd.forward(target);
        assert!((x.hypot(y) - WGS84.distance(center, target)).abs() < 1e-6);

        let back = aeqd.inverse(x, y);
        assert!((back.lon - target.lon).abs() < 1e-8);
        assert!((back.lat - target.lat).abs() < 1e-8);
    }

    #[test]
    fn test_aeqd_disk_vertices_at_radius() {
        let center = GeoPoint::new(-40.0, 10.0);
        let aeqd = AzimuthalEquidistant::new(center);
        let disk = aeqd.polygon_to_geographic(&aeqd.disk(500_000.0, 32));
        assert_eq!(disk.exterior().0.len(), 33);
        for c in disk.exterior().0.iter() {
            let d = WGS84.distance(center, GeoPoint::new(c.x, c.y));
            assert!((d - 500_000.0).abs() < 1e-3);
        }
    }
}
