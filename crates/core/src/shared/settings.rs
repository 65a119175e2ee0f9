use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{
    DEFAULT_COLOR_PRESET, DEFAULT_FRAME_TIMEOUT_MS, DEFAULT_MAX_CONSECUTIVE_TIMEOUTS,
    DETECTOR_INPUT_SIZE, TARGET_FPS, TARGET_HEIGHT, TARGET_WIDTH,
};
use super::stream_config::CaptureConfig;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Tunables for the acquisition pipeline, persisted as JSON.
///
/// Missing keys fall back to their defaults so older files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub frame_timeout_ms: u64,
    pub max_consecutive_timeouts: u32,
    pub color_preset: u8,
    pub equalize_histogram: bool,
    pub min_distance_m: f32,
    pub max_distance_m: f32,
    pub model_path: Option<PathBuf>,
    pub detector_input_size: u32,
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub top_k: usize,
    /// Boxes scoring below this are left unredacted. `None` redacts every box.
    pub min_confidence: Option<f32>,
    pub fill_color: [u8; 3],
    pub anonymize: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: TARGET_WIDTH,
            height: TARGET_HEIGHT,
            fps: TARGET_FPS,
            frame_timeout_ms: DEFAULT_FRAME_TIMEOUT_MS,
            max_consecutive_timeouts: DEFAULT_MAX_CONSECUTIVE_TIMEOUTS,
            color_preset: DEFAULT_COLOR_PRESET,
            equalize_histogram: true,
            min_distance_m: 0.0,
            max_distance_m: 6.0,
            model_path: None,
            detector_input_size: DETECTOR_INPUT_SIZE,
            score_threshold: 0.9,
            nms_threshold: 0.3,
            top_k: 5000,
            min_confidence: None,
            fill_color: [0, 0, 0],
            anonymize: true,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("DepthGuard").join("settings.json"))
    }

    /// Loads the user settings file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring settings: {e}");
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |e| SettingsError::Write {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig::matched(self.width, self.height, self.fps)
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_capture_tool() {
        let s = Settings::default();
        assert_eq!((s.width, s.height, s.fps), (640, 480, 6));
        assert_eq!(s.color_preset, 3);
        assert_eq!(s.detector_input_size, 320);
        assert!(s.min_confidence.is_none());
        assert!(s.anonymize);
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("settings.json");
        let settings = Settings {
            fps: 30,
            min_confidence: Some(0.5),
            model_path: Some(PathBuf::from("/models/yunet.onnx")),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::from_file(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, r#"{ "fps": 30 }"#).unwrap();
        let s = Settings::from_file(&path).unwrap();
        assert_eq!(s.fps, 30);
        assert_eq!(s.width, 640);
        assert_eq!(s.frame_timeout_ms, 5000);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            Settings::from_file(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            Settings::from_file(&tmp.path().join("absent.json")),
            Err(SettingsError::Read { .. })
        ));
    }

    #[test]
    fn test_capture_config_uses_dimensions() {
        let s = Settings {
            width: 424,
            height: 240,
            fps: 15,
            ..Settings::default()
        };
        let c = s.capture_config();
        assert_eq!((c.color.width, c.color.height, c.color.fps), (424, 240, 15));
        assert_eq!(s.frame_timeout(), Duration::from_secs(5));
    }
}
