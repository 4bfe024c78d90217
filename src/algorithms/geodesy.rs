//! Geodesic computations on the WGS84 ellipsoid
//!
//! Distances are in meters, azimuths in degrees clockwise from north,
//! coordinates in lon/lat order. Inverse and direct problems use
//! Vincenty's iterative formulae; the inverse falls back to Karney's
//! algorithm (through `geo::Geodesic`, which is WGS84) for the
//! nearly-antipodal pairs where the iteration does not converge.

use geo::{Bearing, Distance, Geodesic, Point};

use crate::core::{GeoPoint, WGS84_FLATTENING, WGS84_SEMI_MAJOR_AXIS};
use crate::validation::error::{GeolocationError, Result};

const MAX_ITERATIONS: usize = 200;
const CONVERGENCE: f64 = 1e-12;

/// An ellipsoid of revolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis (meters)
    pub a: f64,
    /// Flattening
    pub f: f64,
    /// Semi-minor axis (meters)
    pub b: f64,
    /// First eccentricity squared
    pub e2: f64,
}

/// The WGS84 ellipsoid, shared by every computation in the crate
pub static WGS84: Ellipsoid = Ellipsoid::new(WGS84_SEMI_MAJOR_AXIS, WGS84_FLATTENING);

/// Solution of the inverse geodesic problem
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseSolution {
    pub distance: f64,
    /// Forward azimuth at the first point
    pub azimuth1: f64,
    /// Forward azimuth at the second point
    pub azimuth2: f64,
}

/// Solution of the direct geodesic problem
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectSolution {
    pub point: GeoPoint,
    /// Forward azimuth at the destination
    pub azimuth: f64,
}

impl Ellipsoid {
    pub const fn new(a: f64, f: f64) -> Self {
        let b = a * (1.0 - f);
        Self { a, f, b, e2: f * (2.0 - f) }
    }

    fn series_coefficients(&self, cos_sq_alpha: f64) -> (f64, f64) {
        let u_sq = cos_sq_alpha * (self.a * self.a - self.b * self.b) / (self.b * self.b);
        let a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
        let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
        (a, b)
    }

    fn delta_sigma(b: f64, sin_sigma: f64, cos_sigma: f64, cos_2sigma_m: f64) -> f64 {
        let c2 = cos_2sigma_m * cos_2sigma_m;
        b * sin_sigma
            * (cos_2sigma_m
                + b / 4.0
                    * (cos_sigma * (-1.0 + 2.0 * c2)
                        - b / 6.0
                            * cos_2sigma_m
                            * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                            * (-3.0 + 4.0 * c2)))
    }

    /// Geodesic distance and azimuths between two points
    pub fn inverse(&self, from: GeoPoint, to: GeoPoint) -> InverseSolution {
        match self.vincenty_inverse(from, to) {
            Some(solution) => solution,
            None => {
                log::debug!(
                    "geodesic inverse did not converge for ({}, {}) -> ({}, {}); using Karney's solution",
                    from.lon, from.lat, to.lon, to.lat
                );
                karney_inverse(from, to)
            }
        }
    }

    /// Geodesic distance between two points (meters)
    pub fn distance(&self, from: GeoPoint, to: GeoPoint) -> f64 {
        self.inverse(from, to).distance
    }

    fn vincenty_inverse(&self, from: GeoPoint, to: GeoPoint) -> Option<InverseSolution> {
        let f = self.f;
        let l = (to.lon - from.lon).to_radians();
        let u1 = ((1.0 - f) * from.lat.to_radians().tan()).atan();
        let u2 = ((1.0 - f) * to.lat.to_radians().tan()).atan();
        let (sin_u1, cos_u1) = u1.sin_cos();
        let (sin_u2, cos_u2) = u2.sin_cos();

        let mut lambda = l;
        let mut converged = false;
        let (mut sin_sigma, mut cos_sigma, mut sigma) = (0.0, 0.0, 0.0);
        let (mut cos_sq_alpha, mut cos_2sigma_m) = (0.0, 0.0);
        let (mut sin_lambda, mut cos_lambda) = (0.0, 0.0);

        for _ in 0..MAX_ITERATIONS {
            (sin_lambda, cos_lambda) = lambda.sin_cos();
            let t1 = cos_u2 * sin_lambda;
            let t2 = cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda;
            sin_sigma = (t1 * t1 + t2 * t2).sqrt();
            if sin_sigma == 0.0 {
                // coincident points
                return Some(InverseSolution { distance: 0.0, azimuth1: 0.0, azimuth2: 0.0 });
            }
            cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
            sigma = sin_sigma.atan2(cos_sigma);
            let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
            cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
            cos_2sigma_m = if cos_sq_alpha != 0.0 {
                cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
            } else {
                // equatorial line
                0.0
            };
            let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
            let previous = lambda;
            lambda = l
                + (1.0 - c)
                    * f
                    * sin_alpha
                    * (sigma
                        + c * sin_sigma
                            * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));
            if lambda.abs() > std::f64::consts::PI * 1.5 {
                return None;
            }
            if (lambda - previous).abs() < CONVERGENCE {
                converged = true;
                break;
            }
        }
        if !converged {
            return None;
        }

        let (big_a, big_b) = self.series_coefficients(cos_sq_alpha);
        let distance = self.b * big_a * (sigma - Self::delta_sigma(big_b, sin_sigma, cos_sigma, cos_2sigma_m));
        let azimuth1 = (cos_u2 * sin_lambda)
            .atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda)
            .to_degrees();
        let azimuth2 = (cos_u1 * sin_lambda)
            .atan2(-sin_u1 * cos_u2 + cos_u1 * sin_u2 * cos_lambda)
            .to_degrees();

        Some(InverseSolution { distance, azimuth1, azimuth2 })
    }

    /// Destination reached by travelling `distance` meters from `from`
    /// along initial azimuth `azimuth` (degrees)
    pub fn direct(&self, from: GeoPoint, azimuth: f64, distance: f64) -> DirectSolution {
        let f = self.f;
        let (sin_alpha1, cos_alpha1) = azimuth.to_radians().sin_cos();
        let tan_u1 = (1.0 - f) * from.lat.to_radians().tan();
        let cos_u1 = 1.0 / (1.0 + tan_u1 * tan_u1).sqrt();
        let sin_u1 = tan_u1 * cos_u1;
        let sigma1 = tan_u1.atan2(cos_alpha1);
        let sin_alpha = cos_u1 * sin_alpha1;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        let (big_a, big_b) = self.series_coefficients(cos_sq_alpha);

        let first = distance / (self.b * big_a);
        let mut sigma = first;
        for _ in 0..MAX_ITERATIONS {
            let cos_2sigma_m = (2.0 * sigma1 + sigma).cos();
            let (sin_sigma, cos_sigma) = sigma.sin_cos();
            let previous = sigma;
            sigma = first + Self::delta_sigma(big_b, sin_sigma, cos_sigma, cos_2sigma_m);
            if (sigma - previous).abs() < CONVERGENCE {
                break;
            }
        }
        let cos_2sigma_m = (2.0 * sigma1 + sigma).cos();
        let (sin_sigma, cos_sigma) = sigma.sin_cos();

        let x = sin_u1 * sin_sigma - cos_u1 * cos_sigma * cos_alpha1;
        let lat = (sin_u1 * cos_sigma + cos_u1 * sin_sigma * cos_alpha1)
            .atan2((1.0 - f) * (sin_alpha * sin_alpha + x * x).sqrt());
        let lambda = (sin_sigma * sin_alpha1).atan2(cos_u1 * cos_sigma - sin_u1 * sin_sigma * cos_alpha1);
        let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
        let l = lambda
            - (1.0 - c)
                * f
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        DirectSolution {
            point: GeoPoint::new(wrap_longitude(from.lon + l.to_degrees()), lat.to_degrees()),
            azimuth: sin_alpha.atan2(-x).to_degrees(),
        }
    }
}

/// Inverse problem on WGS84 by Karney's method, which converges for every
/// pair including antipodes
fn karney_inverse(from: GeoPoint, to: GeoPoint) -> InverseSolution {
    let (p1, p2) = (Point::new(from.lon, from.lat), Point::new(to.lon, to.lat));
    InverseSolution {
        distance: Geodesic::distance(p1, p2),
        azimuth1: wrap_longitude(Geodesic::bearing(p1, p2)),
        // Forward azimuth at the end is the reverse of the bearing back
        azimuth2: wrap_longitude(Geodesic::bearing(p2, p1) + 180.0),
    }
}

/// Wrap a longitude into [-180, 180)
pub fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Vectorized geodesic distance with broadcasting.
///
/// Each input has length 1 or N; length-1 inputs are repeated to the
/// common length N. Any other mix of lengths fails.
pub fn distances(lon1: &[f64], lat1: &[f64], lon2: &[f64], lat2: &[f64]) -> Result<Vec<f64>> {
    let lengths = [lon1.len(), lat1.len(), lon2.len(), lat2.len()];
    let n = lengths.iter().copied().max().unwrap_or(0);
    if lengths.iter().any(|&len| len != n && len != 1) {
        return Err(GeolocationError::ShapeMismatch(lengths.to_vec()));
    }
    let pick = |v: &[f64], i: usize| if v.len() == 1 { v[0] } else { v[i] };
    Ok((0..n)
        .map(|i| {
            WGS84.distance(
                GeoPoint::new(pick(lon1, i), pick(lat1, i)),
                GeoPoint::new(pick(lon2, i), pick(lat2, i)),
            )
        })
        .collect())
}

/// Distances from one point to each of a set of points
pub fn distances_from(origin: GeoPoint, lons: &[f64], lats: &[f64]) -> Result<Vec<f64>> {
    distances(&[origin.lon], &[origin.lat], lons, lats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equatorial_degree() {
        // One degree of longitude on the equator is a * pi / 180
        let d = WGS84.distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((d - 111319.49079327357).abs() < 1e-3);
    }

    #[test]
    fn test_meridian_quadrant() {
        // Equator to pole along a meridian
        let d = WGS84.distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 90.0));
        assert!((d - 10001965.729).abs() < 0.01);
    }

    #[test]
    fn test_known_distance() {
        // Flinders Peak to Buninyong, the classic Vincenty example
        let from = GeoPoint::new(144.0 + 25.0 / 60.0 + 29.52440 / 3600.0, -(37.0 + 57.0 / 60.0 + 3.72030 / 3600.0));
        let to = GeoPoint::new(143.0 + 55.0 / 60.0 + 35.38390 / 3600.0, -(37.0 + 39.0 / 60.0 + 10.15610 / 3600.0));
        let sol = WGS84.inverse(from, to);
        assert!((sol.distance - 54972.271).abs() < 0.01);
        assert!((sol.azimuth1 - (306.0 + 52.0 / 60.0 + 5.37 / 3600.0 - 360.0)).abs() < 1e-4);
    }

    #[test]
    fn test_coincident_points() {
        let p = GeoPoint::new(10.0, 20.0);
        assert_eq!(WGS84.distance(p, p), 0.0);
    }

    #[test]
    fn test_direct_inverts_inverse() {
        let from = GeoPoint::new(-73.98, 40.75);
        let to = GeoPoint::new(2.35, 48.85);
        let inv = WGS84.inverse(from, to);
        let dest = WGS84.direct(from, inv.azimuth1, inv.distance).point;
        assert!((dest.lon - to.lon).abs() < 1e-8);
        assert!((dest.lat - to.lat).abs() < 1e-8);
    }

    #[test]
    fn test_direct_across_antimeridian() {
        let dest = WGS84.direct(GeoPoint::new(179.5, 0.0), 90.0, 111319.49079327357).point;
        assert!((dest.lon - (-179.5)).abs() < 1e-6);
        assert!(dest.lat.abs() < 1e-9);
    }

    #[test]
    fn test_nearly_antipodal_is_ellipsoidal() {
        // Pairs where Vincenty's iteration fails must still be solved on
        // the ellipsoid, not on a sphere
        let origin = GeoPoint::new(0.0, 0.0);
        for &(lon, lat) in &[(180.0, 0.0), (179.5, -0.2), (179.7, 0.5)] {
            let target = GeoPoint::new(lon, lat);
            let d = WGS84.distance(origin, target);
            let expected = Geodesic::distance(Point::new(0.0, 0.0), Point::new(lon, lat));
            assert!((d - expected).abs() < 1e-3, "{} {}: {} vs {}", lon, lat, d, expected);
        }
        // Half the equator is longer than the meridional path over a pole
        let antipode = WGS84.distance(origin, GeoPoint::new(180.0, 0.0));
        assert!((antipode - 20_003_931.458).abs() < 0.01);
    }

    #[test]
    fn test_nearly_antipodal_azimuth_reaches_target() {
        let from = GeoPoint::new(0.0, 0.0);
        let to = GeoPoint::new(179.5, -0.2);
        let inv = WGS84.inverse(from, to);
        let dest = WGS84.direct(from, inv.azimuth1, inv.distance).point;
        assert!(WGS84.distance(dest, to) < 1.0);
    }

    #[test]
    fn test_broadcast_distances() {
        let d = distances(&[0.0], &[0.0], &[0.0, 1.0, 2.0], &[0.0]).unwrap();
        assert_eq!(d.len(), 3);
        assert_eq!(d[0], 0.0);
        assert!((d[2] - 2.0 * d[1]).abs() < 1e-3);

        assert!(matches!(
            distances(&[0.0, 1.0], &[0.0], &[0.0, 1.0, 2.0], &[0.0]),
            Err(GeolocationError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_wrap_longitude() {
        assert_eq!(wrap_longitude(190.0), -170.0);
        assert_eq!(wrap_longitude(-190.0), 170.0);
        assert_eq!(wrap_longitude(45.0), 45.0);
    }
}
