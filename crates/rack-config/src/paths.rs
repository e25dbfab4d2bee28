//! Platform-specific paths for host configuration and plugins.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/rack/` (Linux), `~/Library/Application Support/rack/` (macOS), `%APPDATA%\rack\` (Windows)
//! - **User plugins**: `~/.local/share/rack/plugins/` (Linux), `~/Library/Application Support/rack/plugins/` (macOS), `%APPDATA%\rack\plugins\` (Windows)

use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "rack";

/// File name of the host settings file.
const CONFIG_FILE: &str = "config.toml";

/// Subdirectory name for plugin manifests.
const PLUGINS_SUBDIR: &str = "plugins";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the default location of the host settings file.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE)
}

/// Returns the user-specific plugin manifest directory.
pub fn user_plugins_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join(PLUGINS_SUBDIR)
}

/// Expand a leading `~` to the home directory.
///
/// Paths without a leading `~`, or when the home directory is unknown, are
/// returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Ensure the user config directory exists.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_user_config_dir() -> Result<PathBuf, crate::ConfigError> {
    let dir = user_config_dir();

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| crate::ConfigError::create_dir(&dir, e))?;
    }

    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_ends_with_app_and_file() {
        let path = default_config_path();
        assert!(path.ends_with("rack/config.toml"));
    }

    #[test]
    fn plugins_dir_ends_with_subdir() {
        assert!(user_plugins_dir().ends_with("rack/plugins"));
    }

    #[test]
    fn expand_home_only_touches_tilde_prefix() {
        let plain = Path::new("/opt/rack/plugins");
        assert_eq!(expand_home(plain), plain);
        let relative = Path::new("plugins/~");
        assert_eq!(expand_home(relative), relative);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/x")), home.join("x"));
        }
    }
}
