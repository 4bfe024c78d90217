//! Geodesy, projections and ranging

pub mod geodesy;
pub mod projection;
pub mod calibration;
pub mod ranging;

pub use geodesy::{Ellipsoid, WGS84};
pub use projection::{AzimuthalEquidistant, CylindricalEqualArea, Geocentric};
pub use calibration::{Calibration, LimitMode, PhysicalLimitsOnly};
pub use ranging::{Gaussian, MinMax, RangingFunction, RangingKind};
