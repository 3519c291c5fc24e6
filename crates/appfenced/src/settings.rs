//! Daemon settings (TOML)
//!
//! Everything has a sensible default; a missing settings file is not an
//! error. Command-line flags and environment variables override whatever the
//! file says.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon settings as parsed from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bridge socket path (default: runtime dir)
    pub socket_path: Option<PathBuf>,

    /// Data directory for the store (default: XDG data dir)
    pub data_dir: Option<PathBuf>,

    /// Package name the enforcement UI runs under. Foreground events for
    /// this package never count against any budget.
    pub own_package: String,

    /// The label of this service's entry in the system settings, used by
    /// the anti-disable guard.
    pub service_label: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            socket_path: None,
            data_dir: None,
            own_package: "io.appfence".into(),
            service_label: "Monitors app usage and enforces screen-time limits".into(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            own_package = "org.example.fence"
            "#,
        )
        .unwrap();

        assert_eq!(settings.own_package, "org.example.fence");
        assert!(settings.socket_path.is_none());
        assert!(!settings.service_label.is_empty());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = Settings::load("/nonexistent/appfence/config.toml").unwrap();
        assert_eq!(settings.own_package, "io.appfence");
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "own_package = [not toml").unwrap();

        assert!(matches!(Settings::load(&path), Err(SettingsError::Parse(_))));
    }
}
