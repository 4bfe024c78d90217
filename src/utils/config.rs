use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunable parameters for the whole geolocation pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeolocationConfig {
    #[serde(default)]
    pub ranging: RangingConfig,
    #[serde(default)]
    pub observation: ObservationConfig,
    #[serde(default)]
    pub location: LocationConfig,
}

/// Ranging function parameters.
///
/// The taper shape and the RTT percentile are empirically tuned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangingConfig {
    /// MinMax interpolant values at the six sorted distance breakpoints
    pub minmax_taper: [f64; 6],
    /// Percentile (0-100) of the RTT samples fed to the Gaussian model
    pub gaussian_rtt_percentile: f64,
    /// Lower bound on the Gaussian mean distance (meters)
    pub gaussian_min_mu: f64,
    /// Lower bound on the Gaussian standard deviation (meters)
    pub gaussian_min_sigma: f64,
    /// Propagation speed behind the empirical distance bound (meters per ms)
    pub empirical_speed_m_per_ms: f64,
    /// Propagation speed behind the physical distance bound (meters per ms)
    pub physical_speed_m_per_ms: f64,
}

/// Observation bounding-region parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationConfig {
    /// Number of vertices in the polygon approximating a geodesic disk
    pub disk_vertices: usize,
    /// Distance bounds at or past this (meters) give up on restriction
    /// and use the whole map
    pub whole_map_distance: f64,
}

/// Location statistics parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Probabilities within this of the maximum tie for representative point
    pub rep_pt_epsilon: f64,
    /// Relative tolerance for treating a matrix as uniform during intersection
    pub uniform_rtol: f64,
    /// Absolute tolerance for the same test
    pub uniform_atol: f64,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value} for {parameter}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    #[error("{message}")]
    IoError { message: String },
    #[error("{message}")]
    SerializationError { message: String },
}

impl Default for RangingConfig {
    fn default() -> Self {
        Self {
            minmax_taper: [0.0, 0.75, 1.0, 1.0, 0.75, 0.0],
            gaussian_rtt_percentile: 25.0,
            gaussian_min_mu: 1000.0,
            gaussian_min_sigma: 1000.0 / 3.0,
            // 4/9 c and 2/3 c
            empirical_speed_m_per_ms: crate::core::SPEED_OF_LIGHT_M_PER_MS * 4.0 / 9.0,
            physical_speed_m_per_ms: crate::core::SPEED_OF_LIGHT_M_PER_MS * 2.0 / 3.0,
        }
    }
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            disk_vertices: 64,
            whole_map_distance: 19975000.0,
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            rep_pt_epsilon: 1e-8,
            uniform_rtol: 1e-5,
            uniform_atol: 1e-8,
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

impl GeolocationConfig {
    /// Load configuration from a JSON file and validate it
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config: GeolocationConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::SerializationError {
                message: format!("Failed to parse config file '{}': {}", path_str, e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(self).map_err(|e| {
            ConfigError::SerializationError {
                message: format!("Failed to serialize config: {}", e),
            }
        })?;

        fs::write(&path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ranging.validate()?;
        self.observation.validate()?;
        self.location.validate()
    }
}

impl RangingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.minmax_taper.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(invalid(
                "minmax_taper",
                format!("{:?}", self.minmax_taper),
                "taper values must be finite and non-negative",
            ));
        }
        if !(0.0..=100.0).contains(&self.gaussian_rtt_percentile) {
            return Err(invalid(
                "gaussian_rtt_percentile",
                self.gaussian_rtt_percentile,
                "percentile must be between 0 and 100",
            ));
        }
        if !(self.gaussian_min_mu >= 0.0) {
            return Err(invalid("gaussian_min_mu", self.gaussian_min_mu, "must be non-negative"));
        }
        if !(self.gaussian_min_sigma > 0.0) {
            return Err(invalid("gaussian_min_sigma", self.gaussian_min_sigma, "must be positive"));
        }
        for (name, speed) in [
            ("empirical_speed_m_per_ms", self.empirical_speed_m_per_ms),
            ("physical_speed_m_per_ms", self.physical_speed_m_per_ms),
        ] {
            if !(speed > 0.0) || !speed.is_finite() {
                return Err(invalid(name, speed, "speed must be positive and finite"));
            }
        }
        Ok(())
    }
}

impl ObservationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.disk_vertices < 8 {
            return Err(invalid("disk_vertices", self.disk_vertices, "need at least 8 vertices"));
        }
        if !(self.whole_map_distance > 0.0) {
            return Err(invalid("whole_map_distance", self.whole_map_distance, "must be positive"));
        }
        Ok(())
    }
}

impl LocationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("rep_pt_epsilon", self.rep_pt_epsilon),
            ("uniform_rtol", self.uniform_rtol),
            ("uniform_atol", self.uniform_atol),
        ] {
            if !(value >= 0.0) || !value.is_finite() {
                return Err(invalid(name, value, "tolerance must be finite and non-negative"));
            }
        }
        Ok(())
    }
}
