use crate::core::{
    DEFAULT_MIN_SCALE_DISTANCE_M, DEFAULT_SCALE_NUMERATOR, DEFAULT_STABLE_AFTER_UPDATES, DEFAULT_WAYPOINT_SPACING_M,
    MIN_WAYPOINT_SPACING_M,
};
use crate::processing::estimator::{EstimatorParams, DEFAULT_HISTORY_LEN};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunable parameters of a navigation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Arc length between intermediary waypoints (meters)
    pub waypoint_spacing_m: f64,
    /// Position estimator tuning
    pub estimator: EstimatorParams,
    /// Number of fixes kept for the estimator
    pub history_len: usize,
    /// Fix updates in `Tracking` before placements freeze
    pub stable_after_updates: u32,
    /// Marker scale numerator (scale = numerator / distance)
    pub scale_numerator: f64,
    /// Distance floor for the scale cue (meters)
    pub min_scale_distance_m: f64,
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Invalid parameter value
    InvalidParameter { parameter: String, value: String, reason: String },
    /// Configuration file I/O error
    IoError { message: String },
    /// JSON serialization/deserialization error
    SerializationError { message: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            waypoint_spacing_m: DEFAULT_WAYPOINT_SPACING_M,
            estimator: EstimatorParams::default(),
            history_len: DEFAULT_HISTORY_LEN,
            stable_after_updates: DEFAULT_STABLE_AFTER_UPDATES,
            scale_numerator: DEFAULT_SCALE_NUMERATOR,
            min_scale_distance_m: DEFAULT_MIN_SCALE_DISTANCE_M,
        }
    }
}

fn invalid(parameter: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(parameter: &str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(parameter, value, "must be a positive finite number"))
    }
}

impl NavigationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON document; missing fields take defaults
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: NavigationConfig = serde_json::from_str(content).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to parse config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;
        let config = Self::from_json_str(&content)?;
        info!("Loaded navigation config from {}", path_str);
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to serialize config: {}", e),
        })?;
        fs::write(&path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })
    }

    /// Check every parameter, returning the first violation
    pub fn validate(&self) -> ConfigResult<()> {
        positive("waypoint_spacing_m", self.waypoint_spacing_m)?;
        if self.waypoint_spacing_m < MIN_WAYPOINT_SPACING_M {
            return Err(invalid(
                "waypoint_spacing_m",
                self.waypoint_spacing_m,
                &format!("must be at least {} m", MIN_WAYPOINT_SPACING_M),
            ));
        }
        positive("estimator.max_accuracy_m", self.estimator.max_accuracy_m)?;
        if self.estimator.window == 0 {
            return Err(invalid("estimator.window", 0, "at least one fix must be averaged"));
        }
        if !self.estimator.recency_half_life_s.is_finite() {
            return Err(invalid(
                "estimator.recency_half_life_s",
                self.estimator.recency_half_life_s,
                "must be finite (use 0 to disable decay)",
            ));
        }
        if self.history_len < self.estimator.window {
            return Err(invalid(
                "history_len",
                self.history_len,
                "must hold at least one estimator window",
            ));
        }
        if self.stable_after_updates == 0 {
            return Err(invalid("stable_after_updates", 0, "must allow at least one update"));
        }
        positive("scale_numerator", self.scale_numerator)?;
        positive("min_scale_distance_m", self.min_scale_distance_m)?;
        Ok(())
    }

    pub fn with_waypoint_spacing(mut self, spacing_m: f64) -> Self {
        self.waypoint_spacing_m = spacing_m;
        self
    }

    pub fn with_max_fix_accuracy(mut self, accuracy_m: f64) -> Self {
        self.estimator.max_accuracy_m = accuracy_m;
        self
    }

    pub fn with_estimator_window(mut self, window: usize) -> Self {
        self.estimator.window = window;
        self
    }

    pub fn with_stable_after_updates(mut self, updates: u32) -> Self {
        self.stable_after_updates = updates;
        self
    }

    pub fn with_scale(mut self, numerator: f64, min_distance_m: f64) -> Self {
        self.scale_numerator = numerator;
        self.min_scale_distance_m = min_distance_m;
        self
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidParameter { parameter, value, reason } => {
                write!(f, "Invalid parameter '{}' = '{}': {}", parameter, value, reason)
            }
            ConfigError::IoError { message } => write!(f, "I/O error: {}", message),
            ConfigError::SerializationError { message } => write!(f, "Serialization error: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = NavigationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stable_after_updates, 6);
        assert_eq!(config.waypoint_spacing_m, 10.0);
        assert_eq!(config.estimator.max_accuracy_m, 65.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = NavigationConfig::from_json_str(r#"{ "stable_after_updates": 12 }"#).unwrap();
        assert_eq!(config.stable_after_updates, 12);
        assert_eq!(config.scale_numerator, DEFAULT_SCALE_NUMERATOR);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = NavigationConfig::default().with_waypoint_spacing(0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { ref parameter, .. }) if parameter == "waypoint_spacing_m"
        ));

        let config = NavigationConfig::default().with_waypoint_spacing(1e-9);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { ref reason, .. }) if reason == "must be at least 0.5 m"
        ));
        assert!(NavigationConfig::default().with_waypoint_spacing(MIN_WAYPOINT_SPACING_M).validate().is_ok());

        assert!(NavigationConfig::default().with_stable_after_updates(0).validate().is_err());
        assert!(NavigationConfig::default().with_estimator_window(0).validate().is_err());
        assert!(NavigationConfig::default().with_estimator_window(64).validate().is_err());
        assert!(NavigationConfig::default().with_max_fix_accuracy(f64::NAN).validate().is_err());
        assert!(NavigationConfig::default().with_scale(100.0, -1.0).validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let result = NavigationConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(ConfigError::SerializationError { .. })));

        let result = NavigationConfig::from_json_str(r#"{ "waypoint_spacing_m": -3.0 }"#);
        assert!(matches!(result, Err(ConfigError::InvalidParameter { .. })));
    }

    #[test]
    fn test_config_file_round_trip() {
        let config = NavigationConfig::default()
            .with_waypoint_spacing(7.5)
            .with_stable_after_updates(9);
        let path = std::env::temp_dir().join(format!("navigation_config_{}.json", std::process::id()));

        config.save_to_file(&path).unwrap();
        let loaded = NavigationConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_missing_file() {
        let result = NavigationConfig::from_file("/nonexistent/navigation.json");
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }
}
