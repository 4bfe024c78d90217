//! Error types and validation

pub mod error;

pub use error::{GeolocationError, Result};
