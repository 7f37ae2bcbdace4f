//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MontageError, MontageResult};

/// Environment variable that forces the parity trace on.
pub const PARITY_DEBUG_ENV: &str = "MONTAGE_PARITY_DEBUG";

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Media backend settings.
    pub backend: BackendConfig,

    /// Render engine settings.
    pub render: RenderConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Settings for the external media toolkit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// `ffmpeg` binary (name on PATH or absolute path).
    pub ffmpeg: String,

    /// `ffprobe` binary.
    pub ffprobe: String,

    /// x264 encoder preset used for intermediate and final encodes.
    pub video_preset: String,

    /// Sample rate used for synthesized silence.
    pub silence_sample_rate: u32,
}

/// Render engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Parent directory for per-render working directories.
    /// `None` uses the system temp dir.
    pub temp_root: Option<PathBuf>,

    /// Whether to write the parity trace next to each output.
    pub trace: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "montage=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            video_preset: "fast".to_string(),
            silence_sample_rate: 44100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl RenderConfig {
    /// Trace toggle after applying the `MONTAGE_PARITY_DEBUG` override.
    pub fn trace_enabled(&self) -> bool {
        self.trace || env_flag(PARITY_DEBUG_ENV)
    }

    /// Resolved temp root.
    pub fn temp_root(&self) -> PathBuf {
        self.temp_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if !config_path.exists() {
            return Self::default();
        }
        Self::load_from(&config_path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring config at {:?}: {}", config_path, e);
            Self::default()
        })
    }

    /// Load config from an explicit file.
    pub fn load_from(path: &Path) -> MontageResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MontageError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        serde_json::from_str(&content).map_err(|e| MontageError::Config {
            message: format!("cannot parse {}: {e}", path.display()),
        })
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Interpret an environment variable as a boolean switch.
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| parse_flag(&value))
        .unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Standard config file location:
/// `$XDG_CONFIG_HOME/montage/config.json`, falling back to `~/.config`.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("montage").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag_accepts_truthy_values() {
        for value in ["1", "true", "YES", " on "] {
            assert!(parse_flag(value), "{value} should be truthy");
        }
        for value in ["", "0", "off", "nope"] {
            assert!(!parse_flag(value), "{value} should be falsy");
        }
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "backend": { "ffmpeg": "/opt/ffmpeg/bin/ffmpeg" } }"#)
                .unwrap();
        assert_eq!(config.backend.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.backend.ffprobe, "ffprobe");
        assert_eq!(config.backend.video_preset, "fast");
        assert!(!config.render.trace);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_reports_config_errors() {
        let dir = std::env::temp_dir().join(format!("montage-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        std::fs::write(&path, r#"{ "render": { "trace": true } }"#).unwrap();
        assert!(AppConfig::load_from(&path).unwrap().render.trace);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(MontageError::Config { .. })
        ));
        std::fs::remove_dir_all(&dir).ok();
    }
}
