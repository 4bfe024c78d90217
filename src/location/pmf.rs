//! The `Location` entity: a probability mass function over the grid
//!
//! Every derived quantity (probability matrix, bounds, centroid and
//! covariance, representative point, area) lives in its own `Memo` and
//! is computed on first access. Maps and observations differ only in
//! where the probability matrix and bounds come from, which is captured
//! by `ProbabilityModel`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};
use nalgebra::{Matrix3, Vector3};
use serde_json::Value;

use crate::algorithms::geodesy::WGS84;
use crate::algorithms::projection::{AzimuthalEquidistant, CylindricalEqualArea, Geocentric};
use crate::core::{GeoPoint, Grid, Memo};
use crate::location::persistence;
use crate::processing::mask::mask_ranges;
use crate::processing::region::Region;
use crate::processing::sparse::SparseGrid;
use crate::utils::config::LocationConfig;
use crate::validation::error::{GeolocationError, Result};

/// Geocentric means closer than this (meters) to the Earth's center have
/// no meaningful direction
const DEGENERATE_MEAN: f64 = 1.0;

/// A probability matrix and whether it carries any information.
///
/// Non-vacuous matrices sum to 1. A vacuous matrix has no positive
/// entries and absorbs everything it is intersected with.
#[derive(Debug, Clone, PartialEq)]
pub struct Pmf {
    pub matrix: SparseGrid,
    pub vacuous: bool,
}

impl Pmf {
    pub fn vacuous(rows: usize, cols: usize) -> Self {
        Self { matrix: SparseGrid::zeros(rows, cols), vacuous: true }
    }

    /// Scale `matrix` to total mass 1, or report it vacuous if it has none
    pub fn normalized(mut matrix: SparseGrid) -> Self {
        let total = matrix.sum();
        if total > 0.0 {
            if total != 1.0 {
                matrix.scale(1.0 / total);
            }
            matrix.eliminate_zeros();
            Self { matrix, vacuous: false }
        } else {
            let (rows, cols) = matrix.shape();
            Self::vacuous(rows, cols)
        }
    }
}

/// Source of a lazily computed probability matrix and bounding region
pub trait ProbabilityModel: fmt::Debug + Send {
    /// The region outside of which the model assigns no probability
    fn bounds(&self, grid: &Grid) -> Result<Region>;

    /// Normalized probability restricted to `region`. `own_bounds` is
    /// what `bounds` returned for the same grid.
    fn probability_within(&self, grid: &Grid, own_bounds: &Region, region: &Region) -> Result<Pmf>;
}

#[derive(Debug)]
enum Source {
    /// Matrix and bounds were supplied at construction
    Resolved,
    /// Matrix is streamed from a saved file on first use
    Stored(PathBuf),
    Modelled(Box<dyn ProbabilityModel>),
}

#[derive(Debug, Clone, Copy)]
struct Moments {
    centroid: Option<GeoPoint>,
    covariance: Matrix3<f64>,
}

/// An estimated location: probability mass over a shared grid
#[derive(Debug)]
pub struct Location {
    grid: Arc<Grid>,
    source: Source,
    probability: Memo<Pmf>,
    bounds: Memo<Region>,
    moments: Memo<Moments>,
    rep_pt: Memo<Option<GeoPoint>>,
    area: Memo<f64>,
    annotations: BTreeMap<String, Value>,
    settings: LocationConfig,
}

impl Location {
    fn with_source(grid: Arc<Grid>, source: Source) -> Self {
        Self {
            grid,
            source,
            probability: Memo::new(),
            bounds: Memo::new(),
            moments: Memo::new(),
            rep_pt: Memo::new(),
            area: Memo::new(),
            annotations: BTreeMap::new(),
            settings: LocationConfig::default(),
        }
    }

    /// A location whose matrix and bounds are already known
    pub fn from_parts(grid: Arc<Grid>, pmf: Pmf, bounds: Region) -> Self {
        let mut location = Self::with_source(grid, Source::Resolved);
        location.probability = Memo::with_value(pmf);
        location.bounds = Memo::with_value(bounds);
        location
    }

    /// A location from a raw probability matrix. The matrix is
    /// normalized and the bounds are the cells holding mass.
    pub fn from_probability(grid: Arc<Grid>, matrix: SparseGrid) -> Self {
        let pmf = Pmf::normalized(matrix);
        let bounds = support_region(&grid, &pmf.matrix);
        Self::from_parts(grid, pmf, bounds)
    }

    pub(crate) fn from_model(grid: Arc<Grid>, model: Box<dyn ProbabilityModel>) -> Self {
        Self::with_source(grid, Source::Modelled(model))
    }

    pub(crate) fn stored(
        grid: Arc<Grid>,
        path: PathBuf,
        centroid: Option<GeoPoint>,
        covariance: Matrix3<f64>,
        annotations: BTreeMap<String, Value>,
    ) -> Self {
        let mut location = Self::with_source(grid, Source::Stored(path));
        location.moments = Memo::with_value(Moments { centroid, covariance });
        location.annotations = annotations;
        location
    }

    pub fn with_settings(mut self, settings: LocationConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &LocationConfig {
        &self.settings
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    pub fn annotations(&self) -> &BTreeMap<String, Value> {
        &self.annotations
    }

    /// Attach opaque metadata. It is saved and loaded but never inspected.
    pub fn annotate(&mut self, key: impl Into<String>, value: Value) {
        self.annotations.insert(key.into(), value);
    }

    pub fn probability(&self) -> Result<&Pmf> {
        self.probability.get_or_try_init(|| match &self.source {
            Source::Modelled(model) => {
                let own = self.bounds()?;
                model.probability_within(&self.grid, own, own)
            }
            Source::Stored(path) => {
                debug!("loading probability matrix from {}", path.display());
                persistence::read_matrix(path, &self.grid)
            }
            // Resolved locations are built with their matrix
            Source::Resolved => {
                let (rows, cols) = self.grid.shape();
                Ok(Pmf::vacuous(rows, cols))
            }
        })
    }

    pub fn vacuous(&self) -> Result<bool> {
        Ok(self.probability()?.vacuous)
    }

    /// Footprint of the non-zero mass
    pub fn bounds(&self) -> Result<&Region> {
        self.bounds.get_or_try_init(|| match &self.source {
            Source::Modelled(model) => model.bounds(&self.grid),
            _ => Ok(support_region(&self.grid, &self.probability()?.matrix)),
        })
    }

    /// Probability-weighted mean position, or `None` for a vacuous location
    pub fn centroid(&self) -> Result<Option<GeoPoint>> {
        Ok(self.moments()?.centroid)
    }

    /// Covariance of the mass in geocentric Cartesian coordinates (m^2)
    pub fn covariance(&self) -> Result<Matrix3<f64>> {
        Ok(self.moments()?.covariance)
    }

    fn moments(&self) -> Result<&Moments> {
        self.moments.get_or_try_init(|| self.compute_moments())
    }

    fn compute_moments(&self) -> Result<Moments> {
        let pmf = self.probability()?;
        let geocentric = Geocentric::new();
        let cells = || {
            pmf.matrix.iter_nonzero().filter_map(|(i, j, v)| {
                let point = GeoPoint::new(self.grid.longitudes[i], self.grid.latitudes[j]);
                let ecef = geocentric.forward(point);
                if ecef.iter().all(|c| c.is_finite()) {
                    Some((ecef, v))
                } else {
                    warn!("geocentric conversion of {}/{} is not finite: {:?}", point.lon, point.lat, ecef);
                    None
                }
            })
        };

        let mut weight = 0.0;
        let mut sum = Vector3::zeros();
        for (ecef, v) in cells() {
            sum += ecef * v;
            weight += v;
        }
        if weight <= 0.0 {
            return Ok(Moments { centroid: None, covariance: Matrix3::zeros() });
        }

        let mean = sum / weight;
        let mut covariance = Matrix3::zeros();
        for (ecef, v) in cells() {
            let d = ecef - mean;
            covariance += d * d.transpose() * v;
        }
        covariance /= weight;

        let centroid = geocentric.inverse(&mean);
        if mean.norm() < DEGENERATE_MEAN || !centroid.is_finite() || centroid.lat.abs() > 90.0 {
            return Err(GeolocationError::NonFiniteCentroid {
                lon: centroid.lon,
                lat: centroid.lat,
                x: mean.x,
                y: mean.y,
                z: mean.z,
            });
        }
        Ok(Moments { centroid: Some(centroid), covariance })
    }

    /// Of all cells with the greatest probability, the one closest to
    /// the centroid. Probabilities within `rep_pt_epsilon` of the
    /// maximum count as ties.
    pub fn rep_pt(&self) -> Result<Option<GeoPoint>> {
        self.rep_pt.get_or_try_init(|| self.compute_rep_pt()).copied()
    }

    fn compute_rep_pt(&self) -> Result<Option<GeoPoint>> {
        let Some(center) = self.centroid()? else {
            return Ok(None);
        };
        let epsilon = self.settings.rep_pt_epsilon;
        let mut best: Option<(GeoPoint, f64, f64)> = None;

        for (i, j, v) in self.probability()?.matrix.iter_nonzero() {
            let point = GeoPoint::new(self.grid.longitudes[i], self.grid.latitudes[j]);
            match best {
                None => best = Some((point, v, WGS84.distance(center, point))),
                Some((_, max_prob, min_dist)) if v > max_prob - epsilon => {
                    let dist = WGS84.distance(center, point);
                    if v > max_prob || dist < min_dist {
                        best = Some((point, max_prob.max(v), dist));
                    }
                }
                Some(_) => {}
            }
        }
        Ok(Some(best.map_or(center, |(point, _, _)| point)))
    }

    /// Probability-weighted true area (m^2) of the cells holding mass
    pub fn area(&self) -> Result<f64> {
        self.area.get_or_try_init(|| self.compute_area()).copied()
    }

    fn compute_area(&self) -> Result<f64> {
        let pmf = self.probability()?;
        let total = pmf.matrix.sum();
        if pmf.vacuous || total <= 0.0 {
            return Ok(0.0);
        }
        // Weights are renormalized from 1 overall to 1 per cell
        let scale = pmf.matrix.nnz() as f64 / total;
        let width = self.grid.cell_width();
        let half_height = self.grid.cell_height() / 2.0;
        let cea = CylindricalEqualArea::new();

        let mut area = 0.0;
        for (_, j, v) in pmf.matrix.iter_nonzero() {
            let lat = self.grid.latitudes[j];
            let (south, north) = (lat - half_height, lat + half_height);
            if !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north) || south >= north {
                return Err(GeolocationError::LatitudeOutOfRange { south, north });
            }
            area += v * scale * cea.rectangle_area(width, south, north);
        }
        Ok(area)
    }

    /// Shortest geodesic distance (m) from (lon, lat) to a cell holding
    /// mass. Anything within one and a half grid cells counts as 0.
    pub fn distance_to_point(&self, lon: f64, lat: f64) -> Result<f64> {
        let aeqd = AzimuthalEquidistant::new(GeoPoint::new(lon, lat));
        let near = self.grid.resolution * 1.5;
        let mut min_distance = f64::INFINITY;

        for (i, j, v) in self.probability()?.matrix.iter_nonzero() {
            if v <= 0.0 {
                continue;
            }
            let (x, y) = aeqd.forward(GeoPoint::new(self.grid.longitudes[i], self.grid.latitudes[j]));
            let d = x.hypot(y);
            if d < near {
                return Ok(0.0);
            }
            min_distance = min_distance.min(d);
        }
        Ok(min_distance)
    }

    /// True if a cell with positive mass contains or adjoins (lon, lat)
    pub fn contains_point(&self, lon: f64, lat: f64) -> Result<bool> {
        let matrix = &self.probability()?.matrix;
        let (rows, cols) = matrix.shape();
        if rows == 0 || cols == 0 {
            return Ok(false);
        }
        let i = self.grid.longitudes.partition_point(|&x| x < lon);
        let j = self.grid.latitudes.partition_point(|&y| y < lat);
        let neighbours = |k: usize, n: usize| k.saturating_sub(1)..(k + 2).min(n);

        Ok(neighbours(i, rows).any(|ii| neighbours(j, cols).any(|jj| matrix.get(ii, jj) > 0.0)))
    }

    /// Normalized probability restricted to the bounding rectangle of
    /// `region`. Vacuous if nothing inside carries mass.
    pub fn probability_within(&self, region: &Region) -> Result<Pmf> {
        let own = self.bounds()?;
        if region == own {
            return self.probability().cloned();
        }
        if let Source::Modelled(model) = &self.source {
            return model.probability_within(&self.grid, own, region);
        }

        let pmf = self.probability()?;
        if pmf.vacuous {
            return Ok(pmf.clone());
        }
        let (rows, cols) = self.grid.shape();
        let Some(rect) = region.bounds() else {
            return Ok(Pmf::vacuous(rows, cols));
        };
        let (is, js) = mask_ranges(&rect, &self.grid.longitudes, &self.grid.latitudes)?;
        Ok(Pmf::normalized(pmf.matrix.restrict(is, js)))
    }

    /// Bayesian combination of two locations on the same grid.
    ///
    /// Only mass inside `restriction` is considered; without one, the
    /// intersection of both bounding regions is used. The restriction
    /// becomes the bounds of the result.
    pub fn intersection(&self, other: &Location, restriction: Option<&Region>) -> Result<Location> {
        self.grid.ensure_compatible(&other.grid)?;

        let region = match restriction {
            Some(region) => region.clone(),
            None => self.bounds()?.intersection(other.bounds()?),
        };
        let left = self.probability_within(&region)?;
        let pmf = if std::ptr::eq(self, other) {
            debug!("self-intersection, reusing operand");
            left
        } else {
            let right = other.probability_within(&region)?;
            combine(left, right, &self.settings)
        };

        Ok(Location::from_parts(Arc::clone(&self.grid), pmf, region).with_settings(self.settings))
    }
}

fn combine(left: Pmf, right: Pmf, settings: &LocationConfig) -> Pmf {
    if left.vacuous {
        return left;
    }
    if right.vacuous {
        return right;
    }

    // With identical supports, a uniform side leaves the other unchanged
    // after normalization, so the product can be skipped.
    if left.matrix.same_pattern(&right.matrix) {
        let (rtol, atol) = (settings.uniform_rtol, settings.uniform_atol);
        if left.matrix.is_nearly_uniform(rtol, atol) {
            debug!("intersection fast path: left operand uniform");
            return right;
        }
        if right.matrix.is_nearly_uniform(rtol, atol) {
            debug!("intersection fast path: right operand uniform");
            return left;
        }
    }

    let product = Pmf::normalized(left.matrix.multiply(&right.matrix));
    if product.vacuous {
        debug!("intersection has disjoint support");
    }
    product
}

/// Rectangle spanning the cells with positive mass, widened by half a
/// cell on each side. Empty if no cell holds mass.
pub fn support_region(grid: &Grid, matrix: &SparseGrid) -> Region {
    match matrix.positive_extent() {
        None => Region::empty(),
        Some((min_i, max_i, min_j, max_j)) => {
            let (half_w, half_h) = (grid.cell_width() / 2.0, grid.cell_height() / 2.0);
            Region::rect(
                grid.longitudes[min_i] - half_w,
                grid.latitudes[min_j] - half_h,
                grid.longitudes[max_i] + half_w,
                grid.latitudes[max_j] + half_h,
            )
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// An n x n grid of 1-degree cells centered on (10, 20)
    pub(crate) fn grid(n: usize) -> Arc<Grid> {
        let half = (n / 2) as f64;
        Arc::new(Grid::from_extent(
            1000.0,
            0.0,
            20.0 + half,
            20.0 - half,
            10.0 + half,
            10.0 - half,
            1.0,
            1.0,
            n,
            n,
        ))
    }

    fn location(grid: &Arc<Grid>, cells: &[(usize, usize, f64)]) -> Location {
        let (rows, cols) = grid.shape();
        let is: Vec<usize> = cells.iter().map(|c| c.0).collect();
        let js: Vec<usize> = cells.iter().map(|c| c.1).collect();
        let vs: Vec<f64> = cells.iter().map(|c| c.2).collect();
        Location::from_probability(Arc::clone(grid), SparseGrid::from_triplets(rows, cols, &is, &js, &vs))
    }

    fn assert_close(a: &SparseGrid, b: &SparseGrid) {
        let x: Vec<_> = a.iter_nonzero().collect();
        let y: Vec<_> = b.iter_nonzero().collect();
        assert_eq!(x.len(), y.len());
        for ((i1, j1, v1), (i2, j2, v2)) in x.into_iter().zip(y) {
            assert_eq!((i1, j1), (i2, j2));
            assert!((v1 - v2).abs() < 1e-12, "{} vs {}", v1, v2);
        }
    }

    #[test]
    fn test_single_cell_scenario() {
        let g = grid(3);
        let loc = location(&g, &[(1, 1, 1.0)]);

        assert!(!loc.vacuous().unwrap());
        let centroid = loc.centroid().unwrap().unwrap();
        assert!((centroid.lon - 10.0).abs() < 1e-6);
        assert!((centroid.lat - 20.0).abs() < 1e-6);
        assert_eq!(loc.rep_pt().unwrap(), Some(GeoPoint::new(10.0, 20.0)));

        let prior = location(&g, &[
            (0, 0, 1.0), (0, 1, 1.0), (0, 2, 1.0),
            (1, 0, 1.0), (1, 1, 1.0), (1, 2, 1.0),
            (2, 0, 1.0), (2, 1, 1.0), (2, 2, 1.0),
        ]);
        let result = loc.intersection(&prior, None).unwrap();
        assert!(!result.vacuous().unwrap());
        let entries: Vec<_> = result.probability().unwrap().matrix.iter_nonzero().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!((entries[0].0, entries[0].1), (1, 1));
        assert!((entries[0].2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_probability_sums_to_one() {
        let g = grid(3);
        let loc = location(&g, &[(0, 0, 3.0), (2, 1, 1.0)]);
        assert!((loc.probability().unwrap().matrix.sum() - 1.0).abs() < 1e-12);

        let empty = location(&g, &[]);
        assert!(empty.vacuous().unwrap());
        assert_eq!(empty.probability().unwrap().matrix.sum(), 0.0);
    }

    #[test]
    fn test_intersection_commutes() {
        let g = grid(3);
        let a = location(&g, &[(0, 0, 0.2), (1, 1, 0.3), (1, 2, 0.5)]);
        let b = location(&g, &[(1, 1, 0.6), (1, 2, 0.2), (2, 2, 0.2)]);
        let ab = a.intersection(&b, None).unwrap();
        let ba = b.intersection(&a, None).unwrap();
        assert_close(&ab.probability().unwrap().matrix, &ba.probability().unwrap().matrix);
        assert!((ab.probability().unwrap().matrix.get(1, 1) - 0.28125 / 0.4375).abs() < 1e-12);
    }

    #[test]
    fn test_self_intersection_is_idempotent() {
        let g = grid(3);
        let a = location(&g, &[(0, 0, 0.2), (1, 1, 0.3), (1, 2, 0.5)]);
        let aa = a.intersection(&a, None).unwrap();
        assert_close(&aa.probability().unwrap().matrix, &a.probability().unwrap().matrix);
    }

    #[test]
    fn test_identical_observations_multiply() {
        // Two separate measurements that happen to agree are both evidence
        let g = grid(3);
        let a = location(&g, &[(0, 0, 0.2), (1, 1, 0.3), (1, 2, 0.5)]);
        let b = location(&g, &[(0, 0, 0.2), (1, 1, 0.3), (1, 2, 0.5)]);
        let ab = a.intersection(&b, None).unwrap();
        let matrix = &ab.probability().unwrap().matrix;
        assert!((matrix.get(0, 0) - 0.04 / 0.38).abs() < 1e-12);
        assert!((matrix.get(1, 1) - 0.09 / 0.38).abs() < 1e-12);
        assert!((matrix.get(1, 2) - 0.25 / 0.38).abs() < 1e-12);
    }

    #[test]
    fn test_vacuous_absorbs() {
        let g = grid(3);
        let a = location(&g, &[(1, 1, 1.0)]);
        let nothing = location(&g, &[]);
        assert!(a.intersection(&nothing, None).unwrap().vacuous().unwrap());
        assert!(nothing.intersection(&a, None).unwrap().vacuous().unwrap());

        assert_eq!(nothing.centroid().unwrap(), None);
        assert_eq!(nothing.rep_pt().unwrap(), None);
        assert_eq!(nothing.area().unwrap(), 0.0);
        assert_eq!(nothing.covariance().unwrap(), Matrix3::zeros());
    }

    #[test]
    fn test_disjoint_support_is_vacuous() {
        let g = grid(3);
        let a = location(&g, &[(0, 0, 1.0)]);
        let b = location(&g, &[(1, 1, 1.0)]);
        let restriction = Region::rect(8.0, 18.0, 12.0, 22.0);
        let result = a.intersection(&b, Some(&restriction)).unwrap();
        assert!(result.vacuous().unwrap());
        assert_eq!(result.bounds().unwrap(), &restriction);
    }

    #[test]
    fn test_grid_mismatch() {
        let a = location(&grid(3), &[(1, 1, 1.0)]);
        let mut other = (*grid(3)).clone();
        other.fuzz = 5.0;
        let b = location(&Arc::new(other), &[(1, 1, 1.0)]);
        assert!(matches!(
            a.intersection(&b, None),
            Err(GeolocationError::GridMismatch { .. })
        ));
    }

    #[test]
    fn test_bounds_cover_support() {
        let g = grid(5);
        let loc = location(&g, &[(1, 2, 0.5), (3, 3, 0.5)]);
        assert_eq!(loc.bounds().unwrap().bounds(), Some([8.5, 19.5, 11.5, 21.5]));
    }

    #[test]
    fn test_rep_pt_prefers_cell_near_centroid() {
        let g = grid(3);
        let loc = location(&g, &[(0, 1, 0.4), (2, 1, 0.4), (2, 2, 0.2)]);
        assert_eq!(loc.rep_pt().unwrap(), Some(GeoPoint::new(11.0, 20.0)));
    }

    #[test]
    fn test_covariance_single_cell_is_zero() {
        let loc = location(&grid(3), &[(1, 1, 1.0)]);
        assert!(loc.covariance().unwrap().norm() < 1e-6);

        let spread = location(&grid(3), &[(0, 1, 0.5), (2, 1, 0.5)]);
        let cov = spread.covariance().unwrap();
        assert!(cov.norm() > 1e9);
        assert!((cov - cov.transpose()).norm() < 1e-3);
    }

    #[test]
    fn test_centroid_at_earth_center_fails() {
        // Equal mass on opposite sides of the equator averages to the center
        let g = Arc::new(Grid::from_extent(1000.0, 0.0, 1.0, 0.0, 180.0, 0.0, 90.0, 1.0, 3, 2));
        let loc = location(&g, &[(0, 0, 0.5), (2, 0, 0.5)]);
        assert!(matches!(loc.centroid(), Err(GeolocationError::NonFiniteCentroid { .. })));
        assert!(loc.covariance().is_err());

        let ring = Arc::new(Grid::from_extent(1000.0, 0.0, 1.0, 0.0, 90.0, -180.0, 90.0, 1.0, 4, 2));
        let loc = location(&ring, &[(0, 0, 1.0), (1, 0, 1.0), (2, 0, 1.0), (3, 0, 1.0)]);
        assert!(matches!(loc.centroid(), Err(GeolocationError::NonFiniteCentroid { .. })));
    }

    #[test]
    fn test_non_finite_cell_skipped() {
        let mut g = (*grid(3)).clone();
        g.latitudes[2] = f64::NAN;
        let loc = location(&Arc::new(g), &[(1, 1, 0.5), (1, 2, 0.5)]);
        let centroid = loc.centroid().unwrap().unwrap();
        assert!((centroid.lon - 10.0).abs() < 1e-6);
        assert!((centroid.lat - 20.0).abs() < 1e-6);
        assert_eq!(loc.covariance().unwrap(), Matrix3::zeros());
    }

    #[test]
    fn test_area_single_cell() {
        let loc = location(&grid(3), &[(1, 1, 1.0)]);
        let expected = CylindricalEqualArea::new().rectangle_area(1.0, 19.5, 20.5);
        assert!((loc.area().unwrap() - expected).abs() / expected < 1e-9);
        // Roughly 111 km x 104 km
        assert!(expected > 1.1e10 && expected < 1.2e10);
    }

    #[test]
    fn test_area_past_pole_fails() {
        let g = Arc::new(Grid::from_extent(1000.0, 0.0, 90.0, 88.0, 1.0, 0.0, 1.0, 1.0, 2, 3));
        let loc = location(&g, &[(0, 2, 1.0)]);
        assert!(matches!(loc.area(), Err(GeolocationError::LatitudeOutOfRange { .. })));
    }

    #[test]
    fn test_contains_point_neighbourhood() {
        let g = grid(5);
        let loc = location(&g, &[(2, 2, 1.0)]);
        for lon in [9.0, 10.0, 11.0] {
            for lat in [19.0, 20.0, 21.0] {
                assert!(loc.contains_point(lon, lat).unwrap(), "{} {}", lon, lat);
            }
        }
        assert!(loc.contains_point(9.5, 19.5).unwrap());
        assert!(!loc.contains_point(8.0, 18.0).unwrap());
        assert!(!loc.contains_point(12.0, 22.0).unwrap());
        assert!(!loc.contains_point(12.0, 20.0).unwrap());
    }

    #[test]
    fn test_distance_to_point() {
        let loc = location(&grid(3), &[(1, 1, 1.0)]);
        assert_eq!(loc.distance_to_point(10.0, 20.0).unwrap(), 0.0);

        let expected = WGS84.distance(GeoPoint::new(10.0, 22.0), GeoPoint::new(10.0, 20.0));
        let d = loc.distance_to_point(10.0, 22.0).unwrap();
        assert!((d - expected).abs() < 1e-6);
        assert!(d > 200_000.0);

        let nothing = location(&grid(3), &[]);
        assert_eq!(nothing.distance_to_point(10.0, 20.0).unwrap(), f64::INFINITY);
    }

    #[test]
    fn test_probability_within_renormalizes() {
        let g = grid(3);
        let loc = location(&g, &[(0, 0, 0.5), (1, 1, 0.25), (2, 2, 0.25)]);
        let pmf = loc.probability_within(&Region::rect(9.5, 19.5, 11.0, 21.0)).unwrap();
        assert!(!pmf.vacuous);
        assert_eq!(pmf.matrix.get(0, 0), 0.0);
        assert!((pmf.matrix.get(1, 1) - 0.5).abs() < 1e-12);

        let outside = loc.probability_within(&Region::rect(30.0, 30.0, 31.0, 31.0)).unwrap();
        assert!(outside.vacuous);
        assert!(loc.probability_within(&Region::empty()).unwrap().vacuous);
    }

    #[test]
    fn test_annotations() {
        let mut loc = location(&grid(3), &[(1, 1, 1.0)]);
        loc.annotate("host", Value::from("192.0.2.1"));
        assert_eq!(loc.annotations().get("host"), Some(&Value::from("192.0.2.1")));
    }
}
