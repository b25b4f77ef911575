//! Monitor configuration.
//!
//! Loads settings from config.json in the working directory. A missing file
//! is created with defaults on first run. Runtime commands mutate the config
//! and persist it back to the same file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which side of the threshold raises an alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdDirection {
    Above,
    Below,
}

/// Region of interest for the temperature display, in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for Roi {
    fn default() -> Self {
        Self {
            x: 100,
            y: 100,
            width: 200,
            height: 100,
        }
    }
}

impl Roi {
    /// Returns a rectangle covering the centered half of a frame.
    pub fn centered(frame_width: u32, frame_height: u32) -> Self {
        Self {
            x: frame_width / 4,
            y: frame_height / 4,
            width: frame_width / 2,
            height: frame_height / 4,
        }
    }

    /// Builds a rectangle from two corner points given in either order.
    pub fn from_corners(a: (u32, u32), b: (u32, u32)) -> Self {
        Self {
            x: a.0.min(b.0),
            y: a.1.min(b.1),
            width: a.0.abs_diff(b.0),
            height: a.1.abs_diff(b.1),
        }
    }

    /// Clamps the rectangle so it lies entirely within a frame of the given
    /// size. Width and height shrink before the origin moves.
    pub fn clamped(&self, frame_width: u32, frame_height: u32) -> Self {
        let x = self.x.min(frame_width.saturating_sub(1));
        let y = self.y.min(frame_height.saturating_sub(1));
        Self {
            x,
            y,
            width: self.width.max(1).min(frame_width - x),
            height: self.height.max(1).min(frame_height - y),
        }
    }
}

fn default_camera_index() -> u32 {
    0
}

fn default_threshold() -> f64 {
    50.0
}

fn default_direction() -> ThresholdDirection {
    ThresholdDirection::Above
}

fn default_cooldown() -> u64 {
    60
}

fn default_ocr_config() -> String {
    "--psm 7 -c tessedit_char_whitelist=0123456789.-°CF".to_string()
}

fn default_log_file() -> String {
    "temperature_log.txt".to_string()
}

fn default_capture_interval() -> f64 {
    1.0
}

fn default_log_interval() -> u64 {
    10
}

/// Complete monitor configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Camera device index (usually 0 or 1)
    #[serde(default = "default_camera_index")]
    pub camera_index: u32,
    /// Alert threshold value in °C
    #[serde(default = "default_threshold")]
    pub temperature_threshold: f64,
    /// Whether readings at or above, or at or below, the threshold alert
    #[serde(default = "default_direction")]
    pub threshold_direction: ThresholdDirection,
    /// Minimum interval between alerts (seconds)
    #[serde(default = "default_cooldown")]
    pub alert_cooldown_seconds: u64,
    /// Region of the frame holding the temperature display
    #[serde(default)]
    pub roi: Roi,
    /// Extra arguments passed to the tesseract CLI
    #[serde(default = "default_ocr_config")]
    pub ocr_config: String,
    /// Append-only temperature log destination
    #[serde(default = "default_log_file")]
    pub log_file: String,
    /// Write an annotated preview frame alongside status logging
    #[serde(default)]
    pub enable_preview: bool,
    /// Sleep between polls (seconds)
    #[serde(default = "default_capture_interval")]
    pub capture_interval: f64,
    /// Interval between normal-status log lines (seconds)
    #[serde(default = "default_log_interval")]
    pub log_interval: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            camera_index: default_camera_index(),
            temperature_threshold: default_threshold(),
            threshold_direction: default_direction(),
            alert_cooldown_seconds: default_cooldown(),
            roi: Roi::default(),
            ocr_config: default_ocr_config(),
            log_file: default_log_file(),
            enable_preview: false,
            capture_interval: default_capture_interval(),
            log_interval: default_log_interval(),
        }
    }
}

impl MonitorConfig {
    /// Loads the configuration, writing defaults on first run.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path)?;
            crate::log(&format!(
                "Created default config file: {}",
                path.display()
            ));
            Ok(config)
        }
    }

    /// Saves the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = MonitorConfig::default();
        config.camera_index = 2;
        config.temperature_threshold = 42.5;
        config.threshold_direction = ThresholdDirection::Below;
        config.roi = Roi {
            x: 10,
            y: 20,
            width: 30,
            height: 40,
        };
        config.enable_preview = true;

        config.save(&path).unwrap();
        let loaded = MonitorConfig::load_or_create(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_first_run_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = MonitorConfig::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, MonitorConfig::default());

        // Loading again reads the file we just wrote
        let reloaded = MonitorConfig::load_or_create(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"temperature_threshold": 75.0}"#).unwrap();

        let config = MonitorConfig::load_or_create(&path).unwrap();
        assert_eq!(config.temperature_threshold, 75.0);
        assert_eq!(config.camera_index, 0);
        assert_eq!(config.log_interval, 10);
        assert_eq!(config.roi, Roi::default());
    }

    #[test]
    fn test_direction_serializes_lowercase() {
        let json = serde_json::to_string(&ThresholdDirection::Above).unwrap();
        assert_eq!(json, r#""above""#);
        let parsed: ThresholdDirection = serde_json::from_str(r#""below""#).unwrap();
        assert_eq!(parsed, ThresholdDirection::Below);
    }

    #[test]
    fn test_roi_from_corners_any_order() {
        let a = Roi::from_corners((10, 20), (110, 70));
        let b = Roi::from_corners((110, 70), (10, 20));
        assert_eq!(a, b);
        assert_eq!(
            a,
            Roi {
                x: 10,
                y: 20,
                width: 100,
                height: 50
            }
        );
    }

    #[test]
    fn test_roi_clamped_stays_in_bounds() {
        let roi = Roi {
            x: 500,
            y: 300,
            width: 400,
            height: 400,
        };
        let clamped = roi.clamped(640, 480);
        assert!(clamped.x < 640);
        assert!(clamped.y < 480);
        assert!(clamped.x + clamped.width <= 640);
        assert!(clamped.y + clamped.height <= 480);
    }

    #[test]
    fn test_roi_clamped_in_bounds_unchanged() {
        let roi = Roi {
            x: 100,
            y: 100,
            width: 200,
            height: 100,
        };
        assert_eq!(roi.clamped(640, 480), roi);
    }

    #[test]
    fn test_roi_centered() {
        let roi = Roi::centered(640, 480);
        assert_eq!(
            roi,
            Roi {
                x: 160,
                y: 120,
                width: 320,
                height: 120
            }
        );
        assert!(roi.x + roi.width <= 640);
        assert!(roi.y + roi.height <= 480);
    }
}
