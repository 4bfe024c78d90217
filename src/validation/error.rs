//! Error classification for the geolocation system
//!
//! Configuration and precondition failures surface immediately. Numerical
//! degeneracies carry the values that produced them. Computations are
//! deterministic, so nothing here is retried.

use crate::utils::config::ConfigError;

pub type Result<T> = std::result::Result<T, GeolocationError>;

#[derive(Debug, thiserror::Error)]
pub enum GeolocationError {
    // Configuration / precondition errors
    /// Two locations were built on different grids
    #[error("can't intersect locations with inconsistent grids: {parameter} {left} != {right}")]
    GridMismatch {
        parameter: String,
        left: String,
        right: String,
    },

    /// A bounds argument could not be read as (west, south, east, north)
    #[error("invalid bounds argument {0}")]
    InvalidBounds(String),

    /// Stored matrix shape agrees with neither orientation of the grid vectors
    #[error("map matrix shape ({rows}, {cols}) is inconsistent with lon/lat vectors ({lon_count}, {lat_count})")]
    MatrixShape {
        rows: usize,
        cols: usize,
        lon_count: usize,
        lat_count: usize,
    },

    /// The prior probability matrix sums to zero
    #[error("baseline probability matrix has zero total mass")]
    EmptyPrior,

    /// The calibration lacks a model the ranging function needs
    #[error("{ranging} ranging function requires a calibration with {missing}")]
    MissingCalibrationModel {
        ranging: &'static str,
        missing: &'static str,
    },

    /// A ranging function was given no timing samples
    #[error("no round-trip-time samples supplied")]
    NoSamples,

    /// Vectorized inputs whose lengths cannot be broadcast together
    #[error("cannot broadcast inputs of lengths {0:?}")]
    ShapeMismatch(Vec<usize>),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    // Numerical degeneracy
    #[error("bogus centroid {lon}/{lat} from geocentric mean ({x}, {y}, {z})")]
    NonFiniteCentroid {
        lon: f64,
        lat: f64,
        x: f64,
        y: f64,
        z: f64,
    },

    #[error("probability density returned non-finite value {value} at distance {distance} m")]
    NonFiniteDensity { distance: f64, value: f64 },

    /// Bounding polygon is invalid or misses its reference point
    #[error("invalid bounding region: {reason}; geometry: {geometry}")]
    InvalidRegion { reason: String, geometry: String },

    #[error("expected -90 <= {south} < {north} <= 90")]
    LatitudeOutOfRange { south: f64, north: f64 },

    // Storage
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt record at line {line}: {reason}")]
    CorruptRecord { line: usize, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let e = GeolocationError::NonFiniteDensity { distance: 1500.0, value: f64::NAN };
        let msg = e.to_string();
        assert!(msg.contains("1500"));
        assert!(msg.contains("NaN"));

        let e = GeolocationError::MatrixShape { rows: 2, cols: 5, lon_count: 3, lat_count: 4 };
        assert!(e.to_string().contains("(2, 5)"));
    }
}
