//! Saving and loading locations as JSON Lines
//!
//! Line 1 holds the file-level attributes; every following line is one
//! non-zero cell. The longitude and latitude vectors are never written
//! out: they are rebuilt by linear spacing from the stored extent and
//! counts. Loading reads only the header, the cells are streamed on
//! first use of the probability matrix.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use log::warn;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{GeoPoint, Grid};
use crate::location::pmf::{Location, Pmf};
use crate::processing::sparse::SparseGrid;
use crate::validation::error::{GeolocationError, Result};

/// File-level attributes of a saved location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationHeader {
    pub resolution: f64,
    pub fuzz: f64,
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub lon_spacing: f64,
    pub lat_spacing: f64,
    pub lon_count: usize,
    pub lat_count: usize,
    /// `null` for a vacuous location
    pub centroid: Option<[f64; 2]>,
    /// Row-major, geocentric
    pub covariance: [[f64; 3]; 3],
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, Value>,
}

/// One non-zero cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationRow {
    pub grid_x: u32,
    pub grid_y: u32,
    pub longitude: f64,
    pub latitude: f64,
    pub prob_mass: f32,
}

impl LocationHeader {
    fn grid(&self) -> Grid {
        Grid::from_extent(
            self.resolution,
            self.fuzz,
            self.north,
            self.south,
            self.east,
            self.west,
            self.lon_spacing,
            self.lat_spacing,
            self.lon_count,
            self.lat_count,
        )
    }
}

impl Location {
    /// Write this location to `path`, computing the centroid and
    /// covariance first if needed
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let grid = self.grid();
        let centroid = self.centroid()?;
        let covariance = self.covariance()?;
        let header = LocationHeader {
            resolution: grid.resolution,
            fuzz: grid.fuzz,
            north: grid.north,
            south: grid.south,
            east: grid.east,
            west: grid.west,
            lon_spacing: grid.lon_spacing,
            lat_spacing: grid.lat_spacing,
            lon_count: grid.lon_count(),
            lat_count: grid.lat_count(),
            centroid: centroid.map(|c| [c.lon, c.lat]),
            covariance: [0usize, 1, 2].map(|r| [0usize, 1, 2].map(|c| covariance[(r, c)])),
            annotations: self.annotations().clone(),
        };

        let mut out = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer(&mut out, &header)?;
        out.write_all(b"\n")?;

        for (i, j, pmass) in self.probability()?.matrix.iter_nonzero() {
            let row = LocationRow {
                grid_x: i as u32,
                grid_y: j as u32,
                longitude: grid.longitudes[i],
                latitude: grid.latitudes[j],
                prob_mass: pmass as f32,
            };
            serde_json::to_writer(&mut out, &row)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }

    /// Read the header of a saved location. The probability matrix is
    /// loaded on first use.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Location> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(GeolocationError::CorruptRecord {
                line: 1,
                reason: "missing header".to_string(),
            });
        }
        let header: LocationHeader = serde_json::from_str(&line)?;

        let c = header.covariance;
        let covariance = Matrix3::new(
            c[0][0], c[0][1], c[0][2],
            c[1][0], c[1][1], c[1][2],
            c[2][0], c[2][1], c[2][2],
        );
        let centroid = header.centroid.map(|[lon, lat]| GeoPoint::new(lon, lat));

        Ok(Location::stored(
            Arc::new(header.grid()),
            path.to_path_buf(),
            centroid,
            covariance,
            header.annotations,
        ))
    }
}

/// Stream the cell records of a saved location into a matrix over `grid`.
///
/// Zero masses are skipped silently; negative masses are dropped with a
/// single warning per file.
pub(crate) fn read_matrix(path: &Path, grid: &Grid) -> Result<Pmf> {
    let (rows, cols) = grid.shape();
    let reader = BufReader::new(File::open(path)?);
    let mut is = Vec::new();
    let mut js = Vec::new();
    let mut vs = Vec::new();
    let mut negative_warning = false;

    for (index, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;
        let row: LocationRow = serde_json::from_str(&line).map_err(|e| GeolocationError::CorruptRecord {
            line: line_no,
            reason: e.to_string(),
        })?;
        let (i, j) = (row.grid_x as usize, row.grid_y as usize);
        if i >= rows || j >= cols {
            return Err(GeolocationError::CorruptRecord {
                line: line_no,
                reason: format!("cell ({}, {}) outside {}x{} grid", i, j, rows, cols),
            });
        }

        if row.prob_mass > 0.0 {
            is.push(i);
            js.push(j);
            vs.push(row.prob_mass as f64);
        } else if row.prob_mass < 0.0 && !negative_warning {
            warn!("{}: negative probability mass", path.display());
            negative_warning = true;
        }
    }

    let vacuous = vs.is_empty();
    Ok(Pmf {
        matrix: SparseGrid::from_triplets(rows, cols, &is, &js, &vs),
        vacuous,
    })
}
