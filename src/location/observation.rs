//! A single RTT observation from a known reference point
//!
//! Both the bounding region and the probability matrix are computed
//! lazily: the region is a geodesic disk around the reference point
//! whose radius is the ranging function's distance bound, and the
//! matrix is the ranging function evaluated at every grid point inside
//! whatever region the caller asks about.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use geo::{Coord, LineString, Polygon};
use log::debug;

use crate::algorithms::calibration::Calibration;
use crate::algorithms::geodesy::distances_from;
use crate::algorithms::projection::AzimuthalEquidistant;
use crate::algorithms::ranging::{RangingFunction, RangingKind};
use crate::core::{GeoPoint, Grid};
use crate::location::map::Map;
use crate::location::pmf::{Location, Pmf, ProbabilityModel};
use crate::processing::mask::mask_ij;
use crate::processing::region::Region;
use crate::processing::sparse::SparseGrid;
use crate::utils::config::{GeolocationConfig, ObservationConfig};
use crate::validation::error::{GeolocationError, Result};

#[derive(Debug)]
struct DiskModel {
    reference: GeoPoint,
    range_fn: Arc<dyn RangingFunction>,
    config: ObservationConfig,
}

impl DiskModel {
    fn disk(&self, grid: &Grid, radius: f64) -> Result<Region> {
        let aeqd = AzimuthalEquidistant::new(self.reference);
        let disk = aeqd.polygon_to_geographic(&aeqd.disk(radius, self.config.disk_vertices));
        let ring = detour_antimeridian(disk.exterior(), grid);

        let mut region = Region::from_polygon(Polygon::new(ring, vec![])).normalized();
        let (lon, lat) = (self.reference.lon, self.reference.lat);
        if !region.contains_point(lon, lat) {
            // The reprojected disk enclosed the complement of itself
            region = grid.extent().difference(&region);
        }

        if !region.is_valid() {
            return Err(GeolocationError::InvalidRegion {
                reason: format!("disk of radius {} m around {}/{} is not a valid polygon", radius, lon, lat),
                geometry: region.describe(),
            });
        }
        if !region.contains_point(lon, lat) {
            return Err(GeolocationError::InvalidRegion {
                reason: format!("disk of radius {} m does not contain its center {}/{}", radius, lon, lat),
                geometry: region.describe(),
            });
        }
        Ok(region)
    }
}

/// Replace every edge that jumps across the ±180° meridian with a
/// detour along the map edge through the nearer pole
fn detour_antimeridian(ring: &LineString<f64>, grid: &Grid) -> LineString<f64> {
    let mut out: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for pair in ring.0.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        out.push(a);
        if (b.x - a.x).abs() > 180.0 {
            let pole = if a.y < 0.0 { grid.south } else { grid.north };
            let (near, far) = if a.x < 0.0 { (grid.west, grid.east) } else { (grid.east, grid.west) };
            out.extend([
                Coord { x: near, y: a.y },
                Coord { x: near, y: pole },
                Coord { x: far, y: pole },
                Coord { x: far, y: b.y },
            ]);
        }
    }
    if let Some(last) = ring.0.last() {
        out.push(*last);
    }
    LineString::new(out)
}

impl ProbabilityModel for DiskModel {
    fn bounds(&self, grid: &Grid) -> Result<Region> {
        let bound = self.range_fn.distance_bound();
        if bound >= self.config.whole_map_distance || bound == 0.0 {
            debug!("distance bound {} m gives no restriction, using the whole map", bound);
            return Ok(grid.extent());
        }
        self.disk(grid, bound)
    }

    fn probability_within(&self, grid: &Grid, own_bounds: &Region, region: &Region) -> Result<Pmf> {
        let (rows, cols) = grid.shape();
        let Some(rect) = region.intersection(own_bounds).bounds() else {
            return Ok(Pmf::vacuous(rows, cols));
        };

        let (is, js) = mask_ij(&rect, &grid.longitudes, &grid.latitudes)?;
        if is.is_empty() {
            return Ok(Pmf::vacuous(rows, cols));
        }
        let lons: Vec<f64> = is.iter().map(|&i| grid.longitudes[i]).collect();
        let lats: Vec<f64> = js.iter().map(|&j| grid.latitudes[j]).collect();
        let distances = distances_from(self.reference, &lons, &lats)?;
        let pvals = self.range_fn.unnormalized_pvals(&distances)?;

        Ok(Pmf::normalized(SparseGrid::from_triplets(rows, cols, &is, &js, &pvals)))
    }
}

/// Distance to a host measured from one reference point.
///
/// The map supplies only the grid; intersect with the map explicitly to
/// apply its prior.
#[derive(Debug)]
pub struct Observation {
    location: Location,
    reference: GeoPoint,
    calibration: Arc<dyn Calibration>,
    rtts: Vec<f64>,
    range_fn: Arc<dyn RangingFunction>,
}

impl Observation {
    pub fn new(
        map: &Map,
        ref_lon: f64,
        ref_lat: f64,
        kind: RangingKind,
        calibration: Arc<dyn Calibration>,
        rtts: &[f64],
    ) -> Result<Self> {
        Self::with_config(map, ref_lon, ref_lat, kind, calibration, rtts, &GeolocationConfig::default())
    }

    pub fn with_config(
        map: &Map,
        ref_lon: f64,
        ref_lat: f64,
        kind: RangingKind,
        calibration: Arc<dyn Calibration>,
        rtts: &[f64],
        config: &GeolocationConfig,
    ) -> Result<Self> {
        config.validate()?;
        let range_fn = kind.build(Arc::clone(&calibration), rtts, map.grid().fuzz, &config.ranging)?;
        let observation =
            Self::with_range_fn(map, ref_lon, ref_lat, range_fn, calibration, rtts, &config.observation);
        Ok(Observation {
            location: observation.location.with_settings(config.location),
            ..observation
        })
    }

    /// Build from an already constructed ranging function
    pub fn with_range_fn(
        map: &Map,
        ref_lon: f64,
        ref_lat: f64,
        range_fn: Arc<dyn RangingFunction>,
        calibration: Arc<dyn Calibration>,
        rtts: &[f64],
        config: &ObservationConfig,
    ) -> Self {
        let reference = GeoPoint::new(ref_lon, ref_lat);
        let model = DiskModel {
            reference,
            range_fn: Arc::clone(&range_fn),
            config: config.clone(),
        };
        Observation {
            location: Location::from_model(Arc::clone(map.grid()), Box::new(model))
                .with_settings(*map.settings()),
            reference,
            calibration,
            rtts: rtts.to_vec(),
            range_fn,
        }
    }

    pub fn reference(&self) -> GeoPoint {
        self.reference
    }

    pub fn ref_lon(&self) -> f64 {
        self.reference.lon
    }

    pub fn ref_lat(&self) -> f64 {
        self.reference.lat
    }

    pub fn calibration(&self) -> &Arc<dyn Calibration> {
        &self.calibration
    }

    pub fn rtts(&self) -> &[f64] {
        &self.rtts
    }

    pub fn range_fn(&self) -> &Arc<dyn RangingFunction> {
        &self.range_fn
    }
}

impl Deref for Observation {
    type Target = Location;

    fn deref(&self) -> &Location {
        &self.location
    }
}

impl DerefMut for Observation {
    fn deref_mut(&mut self) -> &mut Location {
        &mut self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::calibration::{LimitMode, PhysicalLimitsOnly};

    /// Flat probability out to a fixed distance
    #[derive(Debug)]
    struct FixedRange(f64);

    impl RangingFunction for FixedRange {
        fn distance_bound(&self) -> f64 {
            self.0
        }

        fn unnormalized_pvals(&self, distances: &[f64]) -> Result<Vec<f64>> {
            Ok(distances.iter().map(|&d| if d <= self.0 { 1.0 } else { 0.0 }).collect())
        }
    }

    fn map(west: f64, south: f64, east: f64, north: f64, lon_count: usize, lat_count: usize) -> Map {
        let grid = Grid::from_extent(1000.0, 0.0, north, south, east, west, 1.0, 1.0, lon_count, lat_count);
        Map::from_baseline(grid, &vec![vec![1.0; lat_count]; lon_count]).unwrap()
    }

    fn calibration() -> Arc<dyn Calibration> {
        Arc::new(PhysicalLimitsOnly::new(LimitMode::Empirical))
    }

    fn fixed(map: &Map, lon: f64, lat: f64, radius: f64) -> Observation {
        Observation::with_range_fn(
            map,
            lon,
            lat,
            Arc::new(FixedRange(radius)),
            calibration(),
            &[1.0],
            &ObservationConfig::default(),
        )
    }

    #[test]
    fn test_disk_bounds() {
        let m = map(0.0, 10.0, 20.0, 30.0, 21, 21);
        let obs = fixed(&m, 10.0, 20.0, 300_000.0);
        let bounds = obs.bounds().unwrap();
        assert!(bounds.is_valid());
        assert!(bounds.contains_point(10.0, 20.0));
        assert!(bounds.contains_point(12.0, 21.0));
        assert!(!bounds.contains_point(14.0, 20.0));

        // About 2.7 degrees of latitude either way
        let [_, s, _, n] = bounds.bounds().unwrap();
        assert!((n - 20.0 - 2.7).abs() < 0.1);
        assert!((20.0 - s - 2.7).abs() < 0.1);
    }

    #[test]
    fn test_probability_is_lazy_and_restricted() {
        let m = map(0.0, 10.0, 20.0, 30.0, 21, 21);
        let obs = fixed(&m, 10.0, 20.0, 300_000.0);
        let pmf = obs.probability().unwrap();
        assert!(!pmf.vacuous);
        assert!((pmf.matrix.sum() - 1.0).abs() < 1e-12);
        // (10, 20) is grid cell (10, 10)
        assert!(pmf.matrix.get(10, 10) > 0.0);
        assert_eq!(pmf.matrix.get(0, 0), 0.0);
        assert_eq!(pmf.matrix.get(10, 14), 0.0);
        assert!(obs.contains_point(10.0, 20.0).unwrap());
    }

    #[test]
    fn test_whole_map_when_unbounded() {
        let m = map(0.0, 10.0, 20.0, 30.0, 5, 5);
        for radius in [0.0, 20_000_000.0] {
            let obs = fixed(&m, 10.0, 20.0, radius);
            assert_eq!(obs.bounds().unwrap(), &m.grid().extent());
        }
    }

    #[test]
    fn test_disk_across_antimeridian() {
        let m = map(-180.0, -60.0, 180.0, 60.0, 37, 13);
        let obs = fixed(&m, 179.0, 0.0, 500_000.0);
        let bounds = obs.bounds().unwrap();
        assert!(bounds.is_valid());
        assert!(bounds.contains_point(179.0, 0.0));
        assert!(bounds.contains_point(-179.5, 0.0));
        assert!(!bounds.contains_point(0.0, 0.0));
        assert!(!bounds.contains_point(170.0, 0.0));
    }

    #[test]
    fn test_intersect_with_map() {
        let m = map(0.0, 10.0, 20.0, 30.0, 21, 21);
        let obs = Observation::new(&m, 10.0, 20.0, RangingKind::MinMax, calibration(), &[2.0, 3.5]).unwrap();
        let estimate = obs.intersection(&m, None).unwrap();
        assert!(!estimate.vacuous().unwrap());
        assert!((estimate.probability().unwrap().matrix.sum() - 1.0).abs() < 1e-9);

        let centroid = estimate.centroid().unwrap().unwrap();
        assert!((centroid.lon - 10.0).abs() < 0.5);
        assert!((centroid.lat - 20.0).abs() < 0.5);
        assert!(estimate.distance_to_point(10.0, 20.0).unwrap() == 0.0);
    }

    #[test]
    fn test_gaussian_needs_calibration_model() {
        let m = map(0.0, 10.0, 20.0, 30.0, 5, 5);
        let result = Observation::new(&m, 10.0, 20.0, RangingKind::Gaussian, calibration(), &[2.0]);
        assert!(matches!(result, Err(GeolocationError::MissingCalibrationModel { .. })));
    }

    #[test]
    fn test_accessors() {
        let m = map(0.0, 10.0, 20.0, 30.0, 5, 5);
        let obs = fixed(&m, 10.0, 20.0, 1000.0);
        assert_eq!(obs.reference(), GeoPoint::new(10.0, 20.0));
        assert_eq!(obs.ref_lon(), 10.0);
        assert_eq!(obs.rtts(), &[1.0]);
        assert_eq!(obs.range_fn().distance_bound(), 1000.0);
    }
}
