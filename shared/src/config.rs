//! Tuning values for the map/list engine.
//!
//! Every threshold used by the sheet, the render window, the fetch
//! coordinator and the location provider lives here so shells can override
//! them (for example a tablet layout with taller rows) by passing JSON.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AppError, ErrorKind};
use crate::geo::LatLon;

pub const DEFAULT_DRAG_THRESHOLD_PX: f64 = 50.0;
pub const DEFAULT_PEEK_HEIGHT_PX: f64 = 96.0;
pub const DEFAULT_HALF_FRACTION: f64 = 0.5;
pub const DEFAULT_FULL_FRACTION: f64 = 0.85;
pub const DEFAULT_ESTIMATED_ITEM_HEIGHT_PX: f64 = 88.0;
pub const DEFAULT_BUFFER_COUNT: usize = 8;
pub const DEFAULT_INITIAL_RENDER_COUNT: usize = 20;
pub const MAX_SELECTED_CATEGORIES: usize = 5;
pub const DEFAULT_MIN_RESULT_COUNT: u32 = 10;
pub const NATIONWIDE_RADIUS_KM: u32 = 1_000;
pub const DEFAULT_RADIUS_KM: u32 = 25;
pub const DEFAULT_LOCATION_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_LOCATION: (f64, f64) = (56.9496, 24.1052);

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Parse(String),
    #[error("{field} must be {requirement}")]
    Invalid {
        field: &'static str,
        requirement: &'static str,
    },
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Configuration, e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    pub drag_threshold_px: f64,
    pub peek_height_px: f64,
    pub half_fraction: f64,
    pub full_fraction: f64,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: DEFAULT_DRAG_THRESHOLD_PX,
            peek_height_px: DEFAULT_PEEK_HEIGHT_PX,
            half_fraction: DEFAULT_HALF_FRACTION,
            full_fraction: DEFAULT_FULL_FRACTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub estimated_item_height_px: f64,
    pub buffer_count: usize,
    pub initial_render_count: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            estimated_item_height_px: DEFAULT_ESTIMATED_ITEM_HEIGHT_PX,
            buffer_count: DEFAULT_BUFFER_COUNT,
            initial_render_count: DEFAULT_INITIAL_RENDER_COUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclusterConfig {
    /// Points closer than this (degrees) are considered overlapping.
    pub tolerance_deg: f64,
    /// Radius of the first ring of offsets (degrees of latitude).
    pub offset_deg: f64,
}

impl Default for DeclusterConfig {
    fn default() -> Self {
        Self {
            tolerance_deg: 0.000_05,
            offset_deg: 0.000_25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub api_base_url: String,
    pub item_status: String,
    pub default_radius_km: u32,
    pub nationwide_radius_km: u32,
    pub min_result_count: u32,
    pub max_categories: usize,
    pub default_location: LatLon,
    pub location_timeout_ms: u64,
    pub location_high_accuracy: bool,
    pub sheet: SheetConfig,
    pub window: WindowConfig,
    pub decluster: DeclusterConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let (lat, lon) = DEFAULT_LOCATION;
        Self {
            api_base_url: "https://api.darbi.app".into(),
            item_status: "active".into(),
            default_radius_km: DEFAULT_RADIUS_KM,
            nationwide_radius_km: NATIONWIDE_RADIUS_KM,
            min_result_count: DEFAULT_MIN_RESULT_COUNT,
            max_categories: MAX_SELECTED_CATEGORIES,
            default_location: LatLon::from_degrees_unchecked(lat, lon),
            location_timeout_ms: DEFAULT_LOCATION_TIMEOUT_MS,
            location_high_accuracy: true,
            sheet: SheetConfig::default(),
            window: WindowConfig::default(),
            decluster: DeclusterConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.api_base_url).is_err() {
            return Err(ConfigError::Invalid {
                field: "api_base_url",
                requirement: "an absolute URL",
            });
        }
        if self.max_categories == 0 {
            return Err(ConfigError::Invalid {
                field: "max_categories",
                requirement: "at least 1",
            });
        }
        if self.nationwide_radius_km == 0 {
            return Err(ConfigError::Invalid {
                field: "nationwide_radius_km",
                requirement: "greater than 0",
            });
        }
        if !(self.sheet.drag_threshold_px > 0.0) {
            return Err(ConfigError::Invalid {
                field: "sheet.drag_threshold_px",
                requirement: "greater than 0",
            });
        }
        let half = self.sheet.half_fraction;
        let full = self.sheet.full_fraction;
        if !(0.0 < half && half < full && full <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "sheet.half_fraction/full_fraction",
                requirement: "ordered within (0, 1]",
            });
        }
        if !(self.window.estimated_item_height_px > 0.0) {
            return Err(ConfigError::Invalid {
                field: "window.estimated_item_height_px",
                requirement: "greater than 0",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window.buffer_count, 8);
        assert_eq!(config.window.initial_render_count, 20);
        assert_eq!(config.max_categories, 5);
        assert_eq!(config.sheet.drag_threshold_px, 50.0);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config =
            EngineConfig::from_json(r#"{"window": {"buffer_count": 4}, "min_result_count": 3}"#)
                .unwrap();
        assert_eq!(config.window.buffer_count, 4);
        assert_eq!(config.window.initial_render_count, 20);
        assert_eq!(config.min_result_count, 3);
        assert_eq!(config.default_radius_km, DEFAULT_RADIUS_KM);
    }

    #[test]
    fn rejects_unordered_sheet_fractions() {
        let err = EngineConfig::from_json(r#"{"sheet": {"half_fraction": 0.9}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            EngineConfig::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
    }
}
