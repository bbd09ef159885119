// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor configuration.
//!
//! Stored as pretty RON next to the timelines:
//!
//! ```ron
//! EditorConfig(
//!     version: 1,
//!     history_limit: 20,
//!     frame_rate: 30.0,
//!     default_max_frame_no: 30,
//!     ...
//! )
//! ```

use crate::error::{Result, TimelineError};
use crate::transform::InterpolationMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current config format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "motion_timeline.ron";

/// Editor-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Config format version
    pub version: u32,
    /// Maximum number of history entries, 0 disables history
    pub history_limit: usize,
    /// Frame rate of new timelines
    pub frame_rate: f32,
    /// Max frame of new timelines
    pub default_max_frame_no: u32,
    /// Animation name of new timelines
    pub default_anm_name: String,
    /// Interpolation given to keys captured from the host
    pub default_interpolation: InterpolationMode,
    /// Loop flag of new timelines
    pub is_loop_anm: bool,
    /// Song lead-in of new timelines, seconds
    pub start_offset_time: f32,
    /// Song tail of new timelines, seconds
    pub end_offset_time: f32,
    /// Song fade-in of new timelines, seconds
    pub start_fade_time: f32,
    /// Song fade-out of new timelines, seconds
    pub end_fade_time: f32,
    /// Directory timelines are saved under
    pub timeline_dir: PathBuf,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            history_limit: 20,
            frame_rate: 30.0,
            default_max_frame_no: 30,
            default_anm_name: "timeline".to_string(),
            default_interpolation: InterpolationMode::Smooth,
            is_loop_anm: true,
            start_offset_time: 0.5,
            end_offset_time: 0.5,
            start_fade_time: 0.1,
            end_fade_time: 0.0,
            timeline_dir: PathBuf::from("timelines"),
        }
    }
}

impl EditorConfig {
    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EditorConfig = ron::from_str(&content)?;

        if config.version > CONFIG_FORMAT_VERSION {
            return Err(TimelineError::InvalidData(format!(
                "Config version {} is newer than supported version {}",
                config.version, CONFIG_FORMAT_VERSION
            )));
        }

        tracing::info!("Loaded editor config from {:?}", path);
        Ok(config)
    }

    /// Load from a RON file, falling back to defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save to a RON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let pretty = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, pretty)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.default_max_frame_no, 30);
        assert!(config.is_loop_anm);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let config = EditorConfig {
            history_limit: 5,
            default_anm_name: "dance".to_string(),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = EditorConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "EditorConfig(history_limit: 3)").unwrap();

        let loaded = EditorConfig::load(&path).unwrap();
        assert_eq!(loaded.history_limit, 3);
        assert_eq!(loaded.frame_rate, 30.0);
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "EditorConfig(version: 99)").unwrap();
        assert!(EditorConfig::load(&path).is_err());
    }

    #[test]
    fn test_missing_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = EditorConfig::load_or_default(&dir.path().join("none.ron")).unwrap();
        assert_eq!(loaded, EditorConfig::default());
    }
}
