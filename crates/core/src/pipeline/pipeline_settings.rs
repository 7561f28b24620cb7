use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::constants::{
    DEFAULT_BOX_THICKNESS, DEFAULT_MASK_OPACITY, DEFAULT_RESPONSE_LANGUAGE,
    DEFAULT_SEGMENTATION_WINDOW, DEFAULT_WORKER_INTERVAL,
};

use super::pipeline_error::SettingsError;

const APP_DIR: &str = "SceneNarrator";
const SETTINGS_FILE: &str = "settings.json";

/// Explicit configuration handed to the pipeline at start.
///
/// Missing JSON fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Draw tracked bounding boxes. Also gates tracking inference.
    pub show_boxes: bool,
    /// Let the background worker re-run segmentation every cycle for the
    /// active search, instead of segmenting once when the query lands.
    pub dynamic_segmentation: bool,
    pub worker_interval_ms: u64,
    pub segmentation_window_secs: u64,
    pub mask_opacity: f32,
    pub box_thickness: u32,
    pub response_language: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            show_boxes: true,
            dynamic_segmentation: false,
            worker_interval_ms: DEFAULT_WORKER_INTERVAL.as_millis() as u64,
            segmentation_window_secs: DEFAULT_SEGMENTATION_WINDOW.as_secs(),
            mask_opacity: DEFAULT_MASK_OPACITY,
            box_thickness: DEFAULT_BOX_THICKNESS,
            response_language: DEFAULT_RESPONSE_LANGUAGE.to_string(),
        }
    }
}

impl PipelineSettings {
    pub fn worker_interval(&self) -> Duration {
        Duration::from_millis(self.worker_interval_ms)
    }

    pub fn segmentation_window(&self) -> Duration {
        Duration::from_secs(self.segmentation_window_secs)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Loads from the user config directory, falling back to defaults when
    /// the file is missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            log::warn!("{e}; using default settings");
            Self::default()
        })
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let settings = PipelineSettings::default();
        assert!(settings.show_boxes);
        assert!(!settings.dynamic_segmentation);
        assert_eq!(settings.worker_interval(), Duration::from_millis(10));
        assert_eq!(settings.segmentation_window(), Duration::from_secs(20));
        assert_relative_eq!(settings.mask_opacity, 0.5);
        assert_eq!(settings.response_language, "English");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"dynamic_segmentation": true, "segmentation_window_secs": 5}"#)
            .unwrap();

        let settings = PipelineSettings::load_from(&path).unwrap();
        assert!(settings.dynamic_segmentation);
        assert_eq!(settings.segmentation_window(), Duration::from_secs(5));
        assert!(settings.show_boxes);
        assert_eq!(settings.box_thickness, 2);
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = PipelineSettings {
            show_boxes: false,
            response_language: "Polish".into(),
            ..PipelineSettings::default()
        };

        settings.save_to(&path).unwrap();
        assert_eq!(PipelineSettings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineSettings::load_from(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        let err = PipelineSettings::load_from(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn test_config_path_under_app_dir() {
        if let Some(path) = PipelineSettings::config_path() {
            assert!(path.ends_with("SceneNarrator/settings.json"));
        }
    }
}
