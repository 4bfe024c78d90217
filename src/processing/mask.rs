//! Rectangle-to-grid-index masks

use std::ops::Range;

use crate::processing::sparse::SparseGrid;
use crate::validation::error::{GeolocationError, Result};

/// Read a (west, south, east, north) rectangle out of a slice
pub fn parse_bounds(bounds: &[f64]) -> Result<[f64; 4]> {
    match bounds {
        [west, south, east, north] if bounds.iter().all(|v| !v.is_nan()) => {
            Ok([*west, *south, *east, *north])
        }
        _ => Err(GeolocationError::InvalidBounds(format!("{:?}", bounds))),
    }
}

/// Index ranges of the sorted grid vectors that fall inside `bounds`.
///
/// West and south are found by left bisection, east and north by right
/// bisection, so grid points exactly on any edge are included.
pub fn mask_ranges(bounds: &[f64], longitudes: &[f64], latitudes: &[f64]) -> Result<(Range<usize>, Range<usize>)> {
    let [west, south, east, north] = parse_bounds(bounds)?;
    let min_i = longitudes.partition_point(|&x| x < west);
    let max_i = longitudes.partition_point(|&x| x <= east);
    let min_j = latitudes.partition_point(|&y| y < south);
    let max_j = latitudes.partition_point(|&y| y <= north);
    Ok((min_i..max_i.max(min_i), min_j..max_j.max(min_j)))
}

/// The x- and y-indices of every grid point within `bounds`, as the
/// Cartesian product of the longitude and latitude index ranges. The
/// longitude index varies fastest.
pub fn mask_ij(bounds: &[f64], longitudes: &[f64], latitudes: &[f64]) -> Result<(Vec<usize>, Vec<usize>)> {
    let (is, js) = mask_ranges(bounds, longitudes, latitudes)?;
    let n = is.len() * js.len();
    let mut xs = Vec::with_capacity(n);
    let mut ys = Vec::with_capacity(n);
    for j in js {
        for i in is.clone() {
            xs.push(i);
            ys.push(j);
        }
    }
    Ok((xs, ys))
}

/// Sparse matrix that is 1 at every grid point inside `bounds`, 0 elsewhere
pub fn mask_matrix(bounds: &[f64], longitudes: &[f64], latitudes: &[f64]) -> Result<SparseGrid> {
    let (xs, ys) = mask_ij(bounds, longitudes, latitudes)?;
    let ones = vec![1.0; xs.len()];
    Ok(SparseGrid::from_triplets(longitudes.len(), latitudes.len(), &xs, &ys, &ones))
}
