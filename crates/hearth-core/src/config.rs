//! Configuration system
//!
//! TOML file with one table per concern. Every field has a default, so an
//! empty or partial file is valid.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::state::Geometry;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Event record pool limits
    pub pool: PoolConfig,

    /// Pointer normalization and delivery
    pub pointer: PointerConfig,

    /// Screen bounds
    pub screen: ScreenConfig,
}

impl Config {
    /// Load configuration from `path`, or from the first standard location
    /// that exists. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).or_else(Self::find_config_file);

        match config_path {
            Some(path) if path.exists() => {
                info!("Loading configuration from {:?}", path);
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {path:?}"))?;
                let config: Self = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {path:?}"))?;
                Ok(config)
            }
            Some(path) => {
                warn!("Config file not found at {:?}, using defaults", path);
                Ok(Self::default())
            }
            None => {
                info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            dirs::config_dir().map(|p| p.join("hearth/config.toml")),
            dirs::home_dir().map(|p| p.join(".hearth/config.toml")),
            Some(PathBuf::from("/etc/hearth/config.toml")),
        ];

        candidates.into_iter().flatten().find(|p| p.exists())
    }

    /// Generate default configuration as a string
    pub fn default_config_string() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}

/// Event pool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of event records in existence; unbounded when absent
    pub capacity: Option<usize>,
    /// Records created up front
    pub preallocate: usize,
    /// Maximum records queued on one client; unbounded when absent
    pub client_queue_limit: Option<usize>,
    /// Largest client-data payload copied into a single record
    pub client_data_limit: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: Some(1024),
            preallocate: 32,
            client_queue_limit: None,
            client_data_limit: 64 * 1024,
        }
    }
}

/// Acceleration used when neither the file nor the device sets one.
pub const DEFAULT_SCALE: i32 = 3;
pub const DEFAULT_THRESHOLD: i32 = 5;

/// Pointer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    /// Pointer device port; "none" disables the pointer
    pub port: String,
    /// Deliver raw pointer data without window routing
    pub raw_mode: bool,
    /// Acceleration multiplier applied past the threshold; the device's
    /// default when absent
    pub scale: Option<i32>,
    /// Delta magnitude above which acceleration applies; the device's
    /// default when absent
    pub threshold: Option<i32>,
    /// Keep sending button-down while a scroll button is held
    pub scroll_repeat: bool,
    /// Ask the host to re-evaluate portrait mode on every pointer update
    pub auto_portrait: bool,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            port: String::from("pc98"),
            raw_mode: false,
            scale: None,
            threshold: None,
            scroll_repeat: true,
            auto_portrait: false,
        }
    }
}

impl PointerConfig {
    /// Fill in acceleration the file left unset from the opened device's
    /// `(scale, threshold)`.
    pub fn seed_accel(&mut self, (scale, threshold): (i32, i32)) {
        self.scale = self.scale.or(Some(scale));
        self.threshold = self.threshold.or(Some(threshold));
    }

    /// Apply threshold acceleration to one delta component.
    pub fn accelerate(&self, delta: i32) -> i32 {
        let threshold = self.threshold.unwrap_or(DEFAULT_THRESHOLD);
        let scale = self.scale.unwrap_or(DEFAULT_SCALE);
        let magnitude = delta.saturating_abs();
        if threshold <= 0 || magnitude <= threshold {
            return delta;
        }
        let boosted =
            threshold.saturating_add((magnitude - threshold).saturating_mul(scale.max(1)));
        boosted * delta.signum()
    }
}

/// Screen settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

impl ScreenConfig {
    pub const fn geometry(&self) -> Geometry {
        Geometry::new(0, 0, self.width, self.height)
    }

    /// Clamp a position onto the screen.
    pub fn clamp(&self, x: i32, y: i32) -> (i32, i32) {
        let max_x = (self.width as i32 - 1).max(0);
        let max_y = (self.height as i32 - 1).max(0);
        (x.clamp(0, max_x), y.clamp(0, max_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pool.capacity, Some(1024));
        assert!(!config.pointer.raw_mode);
        assert_eq!(config.screen.geometry(), Geometry::new(0, 0, 640, 480));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pointer]\nraw_mode = true\n\n[screen]\nwidth = 320").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert!(config.pointer.raw_mode);
        assert_eq!(config.pointer.threshold, None);
        assert_eq!(config.screen.width, 320);
        assert_eq!(config.screen.height, 480);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pool]\ncapacity = \"lots\"").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn acceleration_past_threshold() {
        let pointer = PointerConfig::default();
        assert_eq!(pointer.accelerate(4), 4);
        assert_eq!(pointer.accelerate(5), 5);
        assert_eq!(pointer.accelerate(7), 11);
        assert_eq!(pointer.accelerate(-7), -11);
    }

    #[test]
    fn device_accel_fills_only_unset_fields() {
        let mut pointer = PointerConfig {
            scale: Some(4),
            ..PointerConfig::default()
        };
        pointer.seed_accel((2, 1));
        assert_eq!((pointer.scale, pointer.threshold), (Some(4), Some(1)));
        assert_eq!(pointer.accelerate(3), 1 + 2 * 4);
    }

    #[test]
    fn acceleration_saturates_on_huge_deltas() {
        let pointer = PointerConfig::default();
        assert_eq!(pointer.accelerate(1_000_000_000), i32::MAX);
        assert_eq!(pointer.accelerate(i32::MIN), -i32::MAX);
    }

    #[test]
    fn clamp_to_screen() {
        let screen = ScreenConfig::default();
        assert_eq!(screen.clamp(-5, 900), (0, 479));
        assert_eq!(screen.clamp(10, 10), (10, 10));
    }
}
