//! Physical constants and system parameters

/// WGS84 semi-major axis (meters)
pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6378137.0;

/// WGS84 flattening
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257223563;

/// Half of the equatorial circumference of the Earth (meters).
/// No target can be farther away than this.
pub const DISTANCE_LIMIT: f64 = 20037508.0;

/// Speed of light in vacuum (meters per millisecond)
pub const SPEED_OF_LIGHT_M_PER_MS: f64 = 299792.458;
