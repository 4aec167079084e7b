use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Viewer settings.
/// Stored in the platform config directory (`$XDG_CONFIG_HOME/toshokan/` or `%APPDATA%\toshokan\`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Window title. Defaults to the document's file name.
    pub window_title: Option<String>,
    /// Clear colour behind the page (RGB).
    pub background: [u8; 3],
    /// Multiplier applied per zoom key press.
    pub zoom_step: f32,
    /// Lower zoom bound in percent.
    pub zoom_min_percent: f32,
    /// Upper zoom bound in percent.
    pub zoom_max_percent: f32,
    /// Font family used for overlay text.
    pub overlay_font_family: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_title: None,
            background: [0, 0, 0],
            zoom_step: 1.25,
            zoom_min_percent: 10.0,
            zoom_max_percent: 2000.0,
            overlay_font_family: "DejaVu Sans".to_string(),
        }
    }
}

impl Config {
    /// Load config from `config.json` in the config directory, or return defaults.
    pub fn load() -> Self {
        let path = config_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!(
                    "No config file at {}, using defaults. Creating default config.",
                    path.display()
                );
                let config = Self::default();
                config.save();
                config
            }
        }
    }

    /// Save current config to `config.json`.
    pub fn save(&self) {
        let path = config_path();
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    log::warn!("Failed to write config to {}: {}", path.display(), e);
                }
            }
            Err(e) => {
                log::warn!("Failed to serialize config: {}", e);
            }
        }
    }

    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        let (lo, hi) = if self.zoom_min_percent <= self.zoom_max_percent {
            (self.zoom_min_percent, self.zoom_max_percent)
        } else {
            (self.zoom_max_percent, self.zoom_min_percent)
        };
        zoom.clamp(lo, hi)
    }
}

fn config_path() -> PathBuf {
    let dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toshokan");
    if !dir.exists() {
        std::fs::create_dir_all(&dir).ok();
    }
    dir.join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = serde_json::from_str(r#"{"zoom_step": 2.0}"#).unwrap();
        assert_eq!(config.zoom_step, 2.0);
        assert_eq!(config.background, [0, 0, 0]);
        assert_eq!(config.overlay_font_family, "DejaVu Sans");
        assert!(config.window_title.is_none());
    }

    #[test]
    fn test_clamp_zoom() {
        let config = Config::default();
        assert_eq!(config.clamp_zoom(5.0), 10.0);
        assert_eq!(config.clamp_zoom(150.0), 150.0);
        assert_eq!(config.clamp_zoom(9000.0), 2000.0);
    }

    #[test]
    fn test_clamp_zoom_swapped_bounds() {
        let config = Config {
            zoom_min_percent: 500.0,
            zoom_max_percent: 50.0,
            ..Config::default()
        };
        assert_eq!(config.clamp_zoom(1000.0), 500.0);
    }
}
