//! Locations: probability mass over the grid, and the map and
//! observations it is derived from

pub mod pmf;
pub mod map;
pub mod observation;
pub mod persistence;

pub use pmf::{Location, Pmf, ProbabilityModel};
pub use map::Map;
pub use observation::Observation;
pub use persistence::{LocationHeader, LocationRow};
