//! Validation errors for geographic input values

use std::fmt;

/// Raised when raw numbers cannot form a valid geographic value
#[derive(Debug, Clone, PartialEq)]
pub enum GeoError {
    /// Latitude outside [-90, 90] or not finite
    InvalidLatitude { value: f64 },
    /// Longitude outside [-180, 180] or not finite
    InvalidLongitude { value: f64 },
    /// Accuracy radius negative or not finite
    InvalidAccuracy { value: f64 },
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoError::InvalidLatitude { value } => {
                write!(f, "Invalid latitude {}: expected a value in [-90, 90]", value)
            }
            GeoError::InvalidLongitude { value } => {
                write!(f, "Invalid longitude {}: expected a value in [-180, 180]", value)
            }
            GeoError::InvalidAccuracy { value } => {
                write!(f, "Invalid horizontal accuracy {} m", value)
            }
        }
    }
}

impl std::error::Error for GeoError {}

/// Result type for geographic value construction
pub type GeoResult<T> = Result<T, GeoError>;
