//! Core data types for the geolocation system

use serde::{Deserialize, Serialize};

use crate::processing::region::Region;
use crate::validation::error::{GeolocationError, Result};

/// A point on the Earth's surface, always in lon/lat order (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

/// The quantized grid every `Location` is defined over.
///
/// `longitudes` and `latitudes` are sorted ascending. The scalar
/// parameters are what two locations must agree on before they can be
/// intersected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Grid resolution, in meters at the equator
    pub resolution: f64,
    /// Coastline uncertainty factor, in meters at the equator
    pub fuzz: f64,
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    /// East-west grid spacing (degrees)
    pub lon_spacing: f64,
    /// North-south grid spacing (degrees)
    pub lat_spacing: f64,
    pub longitudes: Vec<f64>,
    pub latitudes: Vec<f64>,
}

impl Grid {
    /// Build a grid whose coordinate vectors are linearly spaced across
    /// the given extent. This is how saved locations reconstruct theirs.
    #[allow(clippy::too_many_arguments)]
    pub fn from_extent(
        resolution: f64,
        fuzz: f64,
        north: f64,
        south: f64,
        east: f64,
        west: f64,
        lon_spacing: f64,
        lat_spacing: f64,
        lon_count: usize,
        lat_count: usize,
    ) -> Self {
        Self {
            resolution,
            fuzz,
            north,
            south,
            east,
            west,
            lon_spacing,
            lat_spacing,
            longitudes: linspace(west, east, lon_count),
            latitudes: linspace(south, north, lat_count),
        }
    }

    pub fn lon_count(&self) -> usize {
        self.longitudes.len()
    }

    pub fn lat_count(&self) -> usize {
        self.latitudes.len()
    }

    /// Shape of probability matrices over this grid: (longitudes, latitudes)
    pub fn shape(&self) -> (usize, usize) {
        (self.lon_count(), self.lat_count())
    }

    /// The whole grid rectangle as a region
    pub fn extent(&self) -> Region {
        Region::rect(self.west, self.south, self.east, self.north)
    }

    /// Longitude width of one cell. The grid is equally spaced, so any
    /// adjacent pair gives the same answer.
    pub fn cell_width(&self) -> f64 {
        if self.longitudes.len() >= 2 {
            self.longitudes[1] - self.longitudes[0]
        } else {
            self.lon_spacing
        }
    }

    /// Latitude height of one cell
    pub fn cell_height(&self) -> f64 {
        if self.latitudes.len() >= 2 {
            self.latitudes[1] - self.latitudes[0]
        } else {
            self.lat_spacing
        }
    }

    /// Fail unless `other` was built with the same grid parameters
    pub fn ensure_compatible(&self, other: &Grid) -> Result<()> {
        let checks = [
            ("resolution", self.resolution, other.resolution),
            ("fuzz", self.fuzz, other.fuzz),
            ("north", self.north, other.north),
            ("south", self.south, other.south),
            ("east", self.east, other.east),
            ("west", self.west, other.west),
            ("lon_spacing", self.lon_spacing, other.lon_spacing),
            ("lat_spacing", self.lat_spacing, other.lat_spacing),
        ];
        for (name, a, b) in checks {
            if a.to_bits() != b.to_bits() {
                return Err(GeolocationError::GridMismatch {
                    parameter: name.to_string(),
                    left: a.to_string(),
                    right: b.to_string(),
                });
            }
        }
        if self.shape() != other.shape() {
            return Err(GeolocationError::GridMismatch {
                parameter: "shape".to_string(),
                left: format!("{:?}", self.shape()),
                right: format!("{:?}", other.shape()),
            });
        }
        Ok(())
    }
}

/// `count` evenly spaced values from `start` to `stop` inclusive.
/// The last value is exactly `stop`.
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            let mut out: Vec<f64> = (0..count).map(|i| start + i as f64 * step).collect();
            out[count - 1] = stop;
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::from_extent(111320.0, 0.0, 21.0, 19.0, 11.0, 9.0, 1.0, 1.0, 3, 3)
    }

    #[test]
    fn test_linspace_endpoints() {
        let v = linspace(-180.0, 180.0, 7);
        assert_eq!(v.len(), 7);
        assert_eq!(v[0], -180.0);
        assert_eq!(v[6], 180.0);
        assert!((v[3] - 0.0).abs() < 1e-12);
        assert_eq!(linspace(5.0, 9.0, 1), vec![5.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_grid_from_extent() {
        let g = grid();
        assert_eq!(g.longitudes, vec![9.0, 10.0, 11.0]);
        assert_eq!(g.latitudes, vec![19.0, 20.0, 21.0]);
        assert_eq!(g.shape(), (3, 3));
        assert!((g.cell_width() - 1.0).abs() < 1e-12);
        assert!((g.cell_height() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_grid_compatibility() {
        let a = grid();
        let mut b = grid();
        assert!(a.ensure_compatible(&b).is_ok());

        b.fuzz = 10.0;
        match a.ensure_compatible(&b) {
            Err(GeolocationError::GridMismatch { parameter, .. }) => assert_eq!(parameter, "fuzz"),
            other => panic!("expected grid mismatch, got {:?}", other),
        }
    }
}
