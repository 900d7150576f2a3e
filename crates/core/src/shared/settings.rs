use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{
    APP_DIR_NAME, CAPTURE_COOLDOWN, CAPTURE_FILE_PREFIX, CENTER_TOLERANCE, FRAME_BUFFER_COUNT,
    JPEG_QUALITY, LOG_THROTTLE, UI_DEBOUNCE,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
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
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("center tolerance must be between 0.0 and 0.5, got {0}")]
    Tolerance(f64),
    #[error("{0} interval must be greater than zero")]
    ZeroInterval(&'static str),
    #[error("JPEG quality must be between 1 and 100, got {0}")]
    JpegQuality(u8),
    #[error("frame buffer count must be at least 1")]
    NoFrameBuffers,
}

/// Capture tuning read once at startup. Nothing updates it while a
/// session runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub center_tolerance: f64,
    pub capture_cooldown_ms: u64,
    pub ui_debounce_ms: u64,
    pub log_throttle_ms: u64,
    /// Capture folder. `None` means the platform picture directory.
    pub output_dir: Option<PathBuf>,
    pub file_prefix: String,
    pub jpeg_quality: u8,
    /// Frames the camera may have in flight through the pipeline at once.
    pub frame_buffers: usize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            center_tolerance: CENTER_TOLERANCE,
            capture_cooldown_ms: CAPTURE_COOLDOWN.as_millis() as u64,
            ui_debounce_ms: UI_DEBOUNCE.as_millis() as u64,
            log_throttle_ms: LOG_THROTTLE.as_millis() as u64,
            output_dir: None,
            file_prefix: CAPTURE_FILE_PREFIX.to_string(),
            jpeg_quality: JPEG_QUALITY,
            frame_buffers: FRAME_BUFFER_COUNT,
        }
    }
}

impl CaptureSettings {
    /// `<config dir>/AutoCenterFaceShot/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    /// Loads the settings file at the default location, falling back to
    /// defaults when it is missing or unreadable.
    pub fn load() -> Self {
        Self::default_path()
            .filter(|path| path.exists())
            .and_then(|path| match Self::load_from(&path) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    log::warn!("Ignoring settings file: {e}");
                    None
                }
            })
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let settings: Self = serde_json::from_str(&json).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Writes the settings as pretty JSON, creating parent directories.
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

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(0.0..=0.5).contains(&self.center_tolerance) {
            return Err(SettingsError::Tolerance(self.center_tolerance));
        }
        if self.capture_cooldown_ms == 0 {
            return Err(SettingsError::ZeroInterval("capture cooldown"));
        }
        if self.ui_debounce_ms == 0 {
            return Err(SettingsError::ZeroInterval("UI debounce"));
        }
        if self.log_throttle_ms == 0 {
            return Err(SettingsError::ZeroInterval("log throttle"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(SettingsError::JpegQuality(self.jpeg_quality));
        }
        if self.frame_buffers == 0 {
            return Err(SettingsError::NoFrameBuffers);
        }
        Ok(())
    }

    pub fn capture_cooldown(&self) -> Duration {
        Duration::from_millis(self.capture_cooldown_ms)
    }

    pub fn ui_debounce(&self) -> Duration {
        Duration::from_millis(self.ui_debounce_ms)
    }

    pub fn log_throttle(&self) -> Duration {
        Duration::from_millis(self.log_throttle_ms)
    }

    /// Resolved capture folder: the configured one, else
    /// `<pictures>/AutoCenterFaceShot`, else `Pictures/AutoCenterFaceShot`.
    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            dirs::picture_dir()
                .unwrap_or_else(|| PathBuf::from("Pictures"))
                .join(APP_DIR_NAME)
        })
    }
}
