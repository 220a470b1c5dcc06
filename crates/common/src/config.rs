//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{UnmarkError, UnmarkResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Processing engine settings.
    pub engine: EngineConfig,

    /// Encoder choices used when a stream is re-encoded.
    pub encoding: EncodingConfig,

    /// Region selection feedback.
    pub selection: SelectionConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Where to find the external media engine and where it may write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// FFmpeg executable (name on PATH or absolute path).
    pub ffmpeg_binary: PathBuf,

    /// ffprobe executable (name on PATH or absolute path).
    pub ffprobe_binary: PathBuf,

    /// Working directory for staged assets. A unique temp directory is
    /// created when unset.
    pub work_dir: Option<PathBuf>,
}

/// Encoder parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Video encoder used when the video stream is filtered.
    pub video_codec: String,

    /// Encoder preset passed alongside the video codec.
    pub video_preset: String,

    /// Audio encoder used when the audio track is replaced.
    pub audio_codec: String,
}

/// Region selection overlay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// How long the overlay stays visible after a region is committed.
    pub overlay_hide_delay_ms: u64,

    /// Overlay stroke width in video pixels.
    pub overlay_stroke_px: u32,

    /// Overlay stroke colour (RGB).
    pub overlay_color: [u8; 3],
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "unmark=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: PathBuf::from("ffmpeg"),
            ffprobe_binary: PathBuf::from("ffprobe"),
            work_dir: None,
        }
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            video_preset: "ultrafast".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            overlay_hide_delay_ms: 1000,
            overlay_stroke_px: 3,
            overlay_color: [255, 0, 0],
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

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> UnmarkResult<Self> {
        if !path.exists() {
            return Err(UnmarkError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| UnmarkError::config(format!("{}: {e}", path.display())))
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

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("unmark").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"encoding":{"video_preset":"veryfast"}}"#).unwrap();
        assert_eq!(config.encoding.video_preset, "veryfast");
        assert_eq!(config.encoding.video_codec, "libx264");
        assert_eq!(config.selection.overlay_hide_delay_ms, 1000);
        assert_eq!(config.engine.ffmpeg_binary, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn test_load_from_missing_path() {
        let err = AppConfig::load_from(Path::new("/nonexistent/unmark/config.json")).unwrap_err();
        assert!(matches!(err, UnmarkError::FileNotFound { .. }));
    }

    #[test]
    fn test_load_from_rejects_malformed_json() {
        let path = std::env::temp_dir().join(format!(
            "unmark-config-test-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "{ not json").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, UnmarkError::Config { .. }));
    }
}
