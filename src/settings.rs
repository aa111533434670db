//! Race settings
//!
//! Loaded from a JSON file next to the binary; anything missing or broken
//! falls back to the defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid setting: {0}")]
    Invalid(&'static str),
}

/// Detail preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DetailPreset {
    #[default]
    Standard,
    /// Road surface and cars only
    Performance,
}

impl DetailPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailPreset::Standard => "Standard",
            DetailPreset::Performance => "Performance",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" | "std" => Some(DetailPreset::Standard),
            "performance" | "perf" => Some(DetailPreset::Performance),
            _ => None,
        }
    }

    /// Whether to draw billboards, lamps and the start gantry
    pub fn scenery_enabled(&self) -> bool {
        matches!(self, DetailPreset::Standard)
    }

    /// Whether to fill the grass either side of the road
    pub fn trackside_enabled(&self) -> bool {
        matches!(self, DetailPreset::Standard)
    }

    /// Whether to draw the rumble strips at the road edges
    pub fn rumble_enabled(&self) -> bool {
        matches!(self, DetailPreset::Standard)
    }

    /// Whether to draw the yellow lines near the road edges
    pub fn guide_lines_enabled(&self) -> bool {
        matches!(self, DetailPreset::Standard)
    }
}

/// Race settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceSettings {
    /// Laps to win the race
    pub laps: u32,
    /// Cars on the grid, including the player
    pub num_cars: usize,
    /// Segments drawn ahead of the camera
    pub view_distance: usize,

    // === Display ===
    pub screen_width: f32,
    pub screen_height: f32,
    pub detail: DetailPreset,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,

    /// A lap taking this long ends the race
    pub lap_time_limit: f32,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            laps: NUM_LAPS,
            num_cars: NUM_CARS,
            view_distance: VIEW_DISTANCE,

            screen_width: SCREEN_WIDTH,
            screen_height: SCREEN_HEIGHT,
            detail: DetailPreset::Standard,

            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,

            lap_time_limit: LAP_TIME_LIMIT,
        }
    }
}

impl RaceSettings {
    /// Create settings from a detail preset
    pub fn from_preset(preset: DetailPreset) -> Self {
        Self {
            detail: preset,
            ..Self::default()
        }
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.laps == 0 {
            return Err(SettingsError::Invalid("laps must be at least 1"));
        }
        if self.num_cars == 0 {
            return Err(SettingsError::Invalid("num_cars must be at least 1"));
        }
        if self.view_distance == 0 {
            return Err(SettingsError::Invalid("view_distance must be at least 1"));
        }
        if !(self.screen_width >= 1.0 && self.screen_height >= 1.0) {
            return Err(SettingsError::Invalid("screen size must be positive"));
        }
        if !(0.0..=1.0).contains(&self.master_volume) || !(0.0..=1.0).contains(&self.sfx_volume) {
            return Err(SettingsError::Invalid("volumes must be between 0 and 1"));
        }
        if !(self.lap_time_limit > 0.0) {
            return Err(SettingsError::Invalid("lap_time_limit must be positive"));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings, falling back to the defaults on any error
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Using default settings ({}: {})", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = RaceSettings::from_json(r#"{ "laps": 3, "detail": "Performance" }"#).unwrap();
        assert_eq!(settings.laps, 3);
        assert_eq!(settings.detail, DetailPreset::Performance);
        assert_eq!(settings.num_cars, NUM_CARS);
        assert_eq!(settings.view_distance, VIEW_DISTANCE);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(matches!(
            RaceSettings::from_json(r#"{ "num_cars": 0 }"#),
            Err(SettingsError::Invalid(_))
        ));
        assert!(matches!(
            RaceSettings::from_json(r#"{ "master_volume": 1.5 }"#),
            Err(SettingsError::Invalid(_))
        ));
        assert!(matches!(
            RaceSettings::from_json("{ not json"),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let path = std::env::temp_dir().join("leading_edge_settings_missing.json");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(RaceSettings::load(&path), Err(SettingsError::Io(_))));
        assert_eq!(RaceSettings::load_or_default(&path), RaceSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("leading_edge_settings_{}.json", std::process::id()));
        let settings = RaceSettings {
            laps: 2,
            ..RaceSettings::from_preset(DetailPreset::Performance)
        };
        settings.save(&path).unwrap();
        assert_eq!(RaceSettings::load(&path).unwrap(), settings);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(DetailPreset::from_str("PERF"), Some(DetailPreset::Performance));
        assert_eq!(DetailPreset::from_str("standard"), Some(DetailPreset::Standard));
        assert_eq!(DetailPreset::from_str("ultra"), None);
        assert_eq!(DetailPreset::from_str(DetailPreset::Performance.as_str()), Some(DetailPreset::Performance));
        assert!(!DetailPreset::Performance.scenery_enabled());
        assert!(DetailPreset::Standard.rumble_enabled());
    }
}
