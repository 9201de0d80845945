use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config field `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Tunables for layout, hit testing and input handling.
///
/// Every field has a default, so a JSON config only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Horizontal margin rendered beyond each edge of the surface.
    pub overscan_px: f64,
    /// Vertical margin used when culling lanes.
    pub vertical_overscan_px: f64,
    pub row_height_px: f64,
    pub lane_header_px: f64,
    pub lane_gap_px: f64,
    /// Maximum pointer distance for a hover hit.
    pub hit_tolerance_px: f64,
    /// Wheel zoom factor is `2^(delta_y * sensitivity)`.
    pub wheel_zoom_sensitivity: f64,
    /// Fraction of the surface width moved by one pan key press.
    pub keyboard_pan_fraction: f64,
    pub keyboard_zoom_factor: f64,
    /// Narrowest window zooming in may produce, in time units.
    pub min_visible_span: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            overscan_px: 100.0,
            vertical_overscan_px: 40.0,
            row_height_px: 20.0,
            lane_header_px: 0.0,
            lane_gap_px: 4.0,
            hit_tolerance_px: 4.0,
            wheel_zoom_sensitivity: 0.01,
            keyboard_pan_fraction: 0.1,
            keyboard_zoom_factor: 2.0,
            min_visible_span: 1e-9,
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn non_negative(field: &'static str, v: f64) -> Result<(), ConfigError> {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: "must be finite and >= 0",
                })
            }
        }
        fn positive(field: &'static str, v: f64) -> Result<(), ConfigError> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: "must be finite and > 0",
                })
            }
        }

        non_negative("overscan_px", self.overscan_px)?;
        non_negative("vertical_overscan_px", self.vertical_overscan_px)?;
        positive("row_height_px", self.row_height_px)?;
        non_negative("lane_header_px", self.lane_header_px)?;
        non_negative("lane_gap_px", self.lane_gap_px)?;
        non_negative("hit_tolerance_px", self.hit_tolerance_px)?;
        positive("wheel_zoom_sensitivity", self.wheel_zoom_sensitivity)?;
        positive("keyboard_pan_fraction", self.keyboard_pan_fraction)?;
        positive("min_visible_span", self.min_visible_span)?;
        if !(self.keyboard_zoom_factor.is_finite() && self.keyboard_zoom_factor > 1.0) {
            return Err(ConfigError::Invalid {
                field: "keyboard_zoom_factor",
                reason: "must be finite and > 1",
            });
        }
        Ok(())
    }

    /// Height of a lane showing `row_count` sub-rows. Empty lanes keep
    /// one row so they stay visible.
    pub fn lane_height(&self, row_count: u32) -> f64 {
        self.lane_header_px + f64::from(row_count.max(1)) * self.row_height_px + self.lane_gap_px
    }
}
