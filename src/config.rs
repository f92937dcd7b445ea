//! Pipeline parameters.
//!
//! Stored as a plain JSON object on disk; any key left out takes its default:
//! ```json
//! {
//!   "resample": { "increment_min": 15, "max_gap_min": 120, "grid_origin": 0 },
//!   "trim": { "max_distance_km": 0.8, "min_period_min": 2880 }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Resampler settings. All durations are minutes except `grid_origin`,
/// which is a Unix timestamp in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleParams {
    pub increment_min: f64,
    pub max_gap_min: f64,
    pub grid_origin: f64,
}

impl Default for ResampleParams {
    fn default() -> Self {
        Self {
            increment_min: 15.0,
            max_gap_min: 120.0,
            grid_origin: 0.0,
        }
    }
}

impl ResampleParams {
    pub fn increment_secs(&self) -> f64 {
        self.increment_min * 60.0
    }

    pub fn max_gap_secs(&self) -> f64 {
        self.max_gap_min * 60.0
    }
}

/// Stationary trimmer settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimParams {
    pub max_distance_km: f64,
    pub min_period_min: f64,
}

impl Default for TrimParams {
    fn default() -> Self {
        Self {
            max_distance_km: 0.8,
            min_period_min: 60.0 * 48.0,
        }
    }
}

impl TrimParams {
    pub fn min_period_secs(&self) -> f64 {
        self.min_period_min * 60.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub resample: ResampleParams,
    pub trim: TrimParams,
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path` and validates it.
    pub fn load(path: &str) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        let r = &self.resample;
        let t = &self.trim;

        if !(r.increment_min.is_finite() && r.increment_min > 0.0) {
            return Err(PipelineError::invalid_config(format!(
                "increment_min must be positive, got {}",
                r.increment_min
            )));
        }
        if !r.grid_origin.is_finite() {
            return Err(PipelineError::invalid_config("grid_origin must be finite"));
        }
        if !(r.max_gap_min.is_finite() && r.max_gap_min >= r.increment_min) {
            return Err(PipelineError::invalid_config(format!(
                "max_gap_min ({}) must be at least increment_min ({})",
                r.max_gap_min, r.increment_min
            )));
        }
        if !(t.max_distance_km.is_finite() && t.max_distance_km >= 0.0) {
            return Err(PipelineError::invalid_config(format!(
                "max_distance_km must be non-negative, got {}",
                t.max_distance_km
            )));
        }
        if !(t.min_period_min.is_finite() && t.min_period_min >= 0.0) {
            return Err(PipelineError::invalid_config(format!(
                "min_period_min must be non-negative, got {}",
                t.min_period_min
            )));
        }

        Ok(())
    }
}
