//! Core types and constants for the geolocation system

pub mod types;
pub mod constants;
pub mod memo;

pub use types::*;
pub use constants::*;
pub use memo::Memo;
