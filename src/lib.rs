//! RTT Geolocation
//!
//! Estimates where a network host is from round-trip-time measurements.
//! A location is a probability mass function over a quantized lon/lat
//! grid, stored as a sparse matrix. A `Map` supplies the grid and a
//! prior; each `Observation` turns the RTTs measured from one reference
//! point into probability by distance; intersecting them refines the
//! estimate.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod location;
pub mod validation;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{GeoPoint, Grid, DISTANCE_LIMIT};
pub use crate::algorithms::{Calibration, Gaussian, LimitMode, MinMax, PhysicalLimitsOnly, RangingFunction, RangingKind};
pub use crate::algorithms::geodesy::{distances, distances_from};
pub use crate::processing::{mask_ij, mask_matrix, Region, SparseGrid};
pub use crate::location::{Location, Map, Observation, Pmf, ProbabilityModel};
pub use crate::validation::{GeolocationError, Result};
pub use crate::utils::GeolocationConfig;
