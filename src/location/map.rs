//! The map: grid definition and prior probability of hosting a server

use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;

use log::debug;
use serde::Deserialize;

use crate::core::Grid;
use crate::location::pmf::{Location, Pmf};
use crate::processing::sparse::SparseGrid;
use crate::utils::config::GeolocationConfig;
use crate::validation::error::{GeolocationError, Result};

#[derive(Debug, Deserialize)]
struct MapFile {
    baseline: Vec<Vec<f64>>,
    attrs: MapAttrs,
}

#[derive(Debug, Deserialize)]
struct MapAttrs {
    longitudes: Vec<f64>,
    latitudes: Vec<f64>,
    resolution: f64,
    fuzz: f64,
    north: f64,
    south: f64,
    east: f64,
    west: f64,
    lon_spacing: f64,
    lat_spacing: f64,
}

/// The grid every observation is computed on, with a prior over it.
///
/// The probability matrix and bounds are available immediately; nothing
/// about a map is lazy.
#[derive(Debug)]
pub struct Map {
    location: Location,
}

impl Map {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_config(path, &GeolocationConfig::default())
    }

    pub fn load_with_config<P: AsRef<Path>>(path: P, config: &GeolocationConfig) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref();
        let file: MapFile = serde_json::from_str(&fs::read_to_string(path)?)?;
        let a = file.attrs;
        let grid = Grid {
            resolution: a.resolution,
            fuzz: a.fuzz,
            north: a.north,
            south: a.south,
            east: a.east,
            west: a.west,
            lon_spacing: a.lon_spacing,
            lat_spacing: a.lat_spacing,
            longitudes: a.longitudes,
            latitudes: a.latitudes,
        };
        let map = Self::from_baseline(grid, &file.baseline)?;
        debug!("loaded map {} with {} cells of prior mass", path.display(), map.location.probability()?.matrix.nnz());
        Ok(Map { location: map.location.with_settings(config.location) })
    }

    /// Build a map from an unnormalized baseline matrix. Either
    /// orientation is accepted: one row per longitude, or one row per
    /// latitude.
    pub fn from_baseline(grid: Grid, baseline: &[Vec<f64>]) -> Result<Self> {
        let rows = baseline.len();
        let cols = baseline.first().map_or(0, Vec::len);
        let (lon_count, lat_count) = grid.shape();
        let shape_error = || GeolocationError::MatrixShape { rows, cols, lon_count, lat_count };

        if baseline.iter().any(|row| row.len() != cols) {
            return Err(shape_error());
        }
        let matrix = if (rows, cols) == (lon_count, lat_count) {
            SparseGrid::from_dense(baseline)
        } else if (rows, cols) == (lat_count, lon_count) {
            SparseGrid::from_dense(baseline).transpose()
        } else {
            return Err(shape_error());
        };

        let pmf = Pmf::normalized(matrix);
        if pmf.vacuous {
            return Err(GeolocationError::EmptyPrior);
        }
        let bounds = grid.extent();
        Ok(Map {
            location: Location::from_parts(Arc::new(grid), pmf, bounds),
        })
    }
}

impl Deref for Map {
    type Target = Location;

    fn deref(&self) -> &Location {
        &self.location
    }
}

impl DerefMut for Map {
    fn deref_mut(&mut self) -> &mut Location {
        &mut self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::region::Region;
    use tempfile::NamedTempFile;

    fn grid() -> Grid {
        // 3 longitudes x 2 latitudes
        Grid::from_extent(1000.0, 0.0, 21.0, 20.0, 11.0, 9.0, 1.0, 1.0, 3, 2)
    }

    #[test]
    fn test_from_baseline_normalizes() {
        let map = Map::from_baseline(grid(), &[vec![1.0, 0.0], vec![2.0, 3.0], vec![0.0, 2.0]]).unwrap();
        let pmf = map.probability().unwrap();
        assert!(!pmf.vacuous);
        assert!((pmf.matrix.sum() - 1.0).abs() < 1e-12);
        assert!((pmf.matrix.get(1, 1) - 0.375).abs() < 1e-12);
        assert_eq!(map.bounds().unwrap(), &Region::rect(9.0, 20.0, 11.0, 21.0));
    }

    #[test]
    fn test_from_baseline_transposed() {
        let by_lat = vec![vec![1.0, 2.0, 0.0], vec![0.0, 3.0, 2.0]];
        let map = Map::from_baseline(grid(), &by_lat).unwrap();
        let pmf = map.probability().unwrap();
        assert_eq!(pmf.matrix.shape(), (3, 2));
        assert!((pmf.matrix.get(1, 1) - 0.375).abs() < 1e-12);
        assert!((pmf.matrix.get(0, 0) - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_bad_shapes() {
        assert!(matches!(
            Map::from_baseline(grid(), &[vec![1.0; 4], vec![1.0; 4]]),
            Err(GeolocationError::MatrixShape { rows: 2, cols: 4, .. })
        ));
        assert!(matches!(
            Map::from_baseline(grid(), &[vec![1.0, 1.0], vec![1.0], vec![1.0, 1.0]]),
            Err(GeolocationError::MatrixShape { .. })
        ));
    }

    #[test]
    fn test_empty_prior() {
        let zeros = vec![vec![0.0; 2]; 3];
        assert!(matches!(Map::from_baseline(grid(), &zeros), Err(GeolocationError::EmptyPrior)));
    }

    #[test]
    fn test_load_map_file() {
        let file = NamedTempFile::new().unwrap();
        let text = r#"{
            "baseline": [[1, 1, 1], [1, 1, 1]],
            "attrs": {
                "longitudes": [9.0, 10.0, 11.0],
                "latitudes": [20.0, 21.0],
                "resolution": 1000.0,
                "fuzz": 0.0,
                "north": 21.0, "south": 20.0, "east": 11.0, "west": 9.0,
                "lon_spacing": 1.0, "lat_spacing": 1.0
            }
        }"#;
        std::fs::write(file.path(), text).unwrap();

        let map = Map::load(file.path()).unwrap();
        assert_eq!(map.grid().shape(), (3, 2));
        let pmf = map.probability().unwrap();
        assert_eq!(pmf.matrix.nnz(), 6);
        assert!((pmf.matrix.get(2, 1) - 1.0 / 6.0).abs() < 1e-12);
    }
}
