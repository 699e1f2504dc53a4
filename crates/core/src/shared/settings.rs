use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roster::roster_view_model::RefreshOrdering;
use crate::shared::constants::{
    CAPTURE_HEIGHT, CAPTURE_INTERVAL_MS, CAPTURE_WIDTH, DEFAULT_API_BASE_URL, JPEG_QUALITY,
    REQUEST_TIMEOUT_MS,
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
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Client-side configuration for live attendance sessions.
///
/// Missing fields in a settings file fall back to their defaults, so older
/// files keep loading as new options are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub capture_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub capture_width: u32,
    pub capture_height: u32,
    pub jpeg_quality: u8,
    pub refresh_ordering: RefreshOrdering,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            capture_interval_ms: CAPTURE_INTERVAL_MS,
            request_timeout_ms: REQUEST_TIMEOUT_MS,
            capture_width: CAPTURE_WIDTH,
            capture_height: CAPTURE_HEIGHT,
            jpeg_quality: JPEG_QUALITY,
            refresh_ordering: RefreshOrdering::default(),
        }
    }
}

impl ClientSettings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ClassroomAttendance").join("settings.json"))
    }

    /// Loads the user's settings file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                log::warn!("{e}; using default settings");
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::config_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |e| SettingsError::Write {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        // Serializing a plain struct of strings and numbers cannot fail.
        let json = serde_json::to_string_pretty(self).unwrap_or_default();
        fs::write(path, json).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(SettingsError::Invalid(format!(
                "API base URL must start with http:// or https://, got '{}'",
                self.api_base_url
            )));
        }
        if self.capture_interval_ms == 0 {
            return Err(SettingsError::Invalid(
                "capture interval must be greater than zero".into(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(SettingsError::Invalid(
                "request timeout must be greater than zero".into(),
            ));
        }
        if self.capture_width == 0 || self.capture_height == 0 {
            return Err(SettingsError::Invalid(format!(
                "capture resolution must be non-zero, got {}x{}",
                self.capture_width, self.capture_height
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(SettingsError::Invalid(format!(
                "JPEG quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
