//! Core types, errors and constants shared by every component

pub mod constants;
pub mod error;
pub mod types;

pub use constants::*;
pub use error::{GeoError, GeoResult};
pub use types::*;
