use crate::heat::HeatConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "tui-heatmap.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub heat: HeatConfig,
    pub display: DisplayConfig,
    /// Point data file; command-line flags take precedence
    pub points: Option<PathBuf>,
    /// Landmass GeoJSON file
    pub boundaries: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Device pixels per logical pixel, capped at 2
    pub pixel_scale: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { pixel_scale: 1.0 }
    }
}

/// Read the config file, falling back to defaults when it is missing or
/// unreadable. An explicit path that does not exist is also just a warning.
pub fn load(path: Option<&Path>) -> Config {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str(&contents) {
            Ok(cfg) => {
                log::info!("loaded config from {}", path.display());
                cfg
            }
            Err(e) => {
                log::warn!("failed to parse {}: {e}; using defaults", path.display());
                Config::default()
            }
        },
        Err(e) => {
            log::warn!("failed to read {}: {e}; using defaults", path.display());
            Config::default()
        }
    }
}
