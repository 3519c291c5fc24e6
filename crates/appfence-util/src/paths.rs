//! Default paths for appfence components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/appfence/appfenced.sock` or `/tmp/appfence-$USER/appfenced.sock`
//! - Data: `$XDG_DATA_HOME/appfence` or `~/.local/share/appfence`

use std::path::PathBuf;

/// Environment variable for overriding the bridge socket path
pub const APPFENCE_SOCKET_ENV: &str = "APPFENCE_SOCKET";

/// Environment variable for overriding the data directory
pub const APPFENCE_DATA_DIR_ENV: &str = "APPFENCE_DATA_DIR";

const SOCKET_FILENAME: &str = "appfenced.sock";

const APP_DIR: &str = "appfence";

/// Get the default bridge socket path.
///
/// Order of precedence:
/// 1. `$APPFENCE_SOCKET` environment variable (if set)
/// 2. `$XDG_RUNTIME_DIR/appfence/appfenced.sock` (if XDG_RUNTIME_DIR is set)
/// 3. `/tmp/appfence-$USER/appfenced.sock` (fallback)
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(APPFENCE_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Get the socket path without checking the APPFENCE_SOCKET env var.
/// Used for default values in settings where the env var is checked separately.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$APPFENCE_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/appfence` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/appfence` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(APPFENCE_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking the APPFENCE_DATA_DIR env var.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default config file path.
///
/// `$XDG_CONFIG_HOME/appfence/config.toml` or `~/.config/appfence/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml");
    }

    PathBuf::from("/etc").join(APP_DIR).join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_contains_appfence() {
        let path = socket_path_without_env();
        assert!(path.to_string_lossy().contains("appfence"));
        assert!(path.to_string_lossy().contains(".sock"));
    }

    #[test]
    fn data_dir_contains_appfence() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("appfence"));
    }

    #[test]
    fn config_path_ends_with_config_toml() {
        let path = default_config_path();
        assert!(path.ends_with("appfence/config.toml"));
    }
}
