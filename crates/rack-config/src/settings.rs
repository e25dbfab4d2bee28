//! The host settings file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::paths::{default_config_path, expand_home, user_plugins_dir};

/// Lowest accepted sample rate in Hz.
pub const MIN_SAMPLE_RATE: u32 = 8_000;
/// Highest accepted sample rate in Hz.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

fn default_sample_rate() -> u32 {
    44_100
}

fn default_block_size() -> usize {
    512
}

/// `[audio]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Processing sample rate in Hz.
    pub sample_rate: u32,
    /// Processing block size in frames.
    pub block_size: usize,
    /// Input device name (substring match).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_device: Option<String>,
    /// Output device name (substring match).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            block_size: default_block_size(),
            input_device: None,
            output_device: None,
        }
    }
}

/// `[routing]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    /// Feed input channel 0 to both channels of the chain.
    pub mono: bool,
}

/// `[master]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterSettings {
    /// Master level in dB.
    pub gain_db: f32,
}

/// `[plugins]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    /// Directories scanned for plugin manifests. `~` expands to home.
    pub search_paths: Vec<PathBuf>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            search_paths: vec![user_plugins_dir()],
        }
    }
}

impl PluginSettings {
    /// Search paths with `~` expanded.
    pub fn resolved_search_paths(&self) -> Vec<PathBuf> {
        self.search_paths.iter().map(|p| expand_home(p)).collect()
    }
}

/// Host settings, loaded from TOML.
///
/// Every section and field is optional in the file; missing values take
/// their defaults.
///
/// # Example
///
/// ```rust
/// use rack_config::HostConfig;
///
/// let config = HostConfig::from_toml("[audio]\nblock_size = 256\n[routing]\nmono = true").unwrap();
/// assert_eq!(config.audio.block_size, 256);
/// assert_eq!(config.audio.sample_rate, 44100);
/// assert!(config.routing.mono);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Audio settings.
    pub audio: AudioSettings,
    /// Routing settings.
    pub routing: RoutingSettings,
    /// Master gain settings.
    pub master: MasterSettings,
    /// Plugin discovery settings.
    pub plugins: PluginSettings,
}

impl HostConfig {
    /// Load from a file and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, or return defaults if it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from the default location, or return defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_or_default(default_config_path())
    }

    /// Parse TOML without validating.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write to a file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.audio.sample_rate;
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&rate) {
            return Err(ConfigError::invalid(
                "audio.sample_rate",
                format!("{rate} Hz is outside {MIN_SAMPLE_RATE}-{MAX_SAMPLE_RATE} Hz"),
            ));
        }
        if self.audio.block_size == 0 {
            return Err(ConfigError::invalid(
                "audio.block_size",
                "must be greater than zero",
            ));
        }
        if !self.master.gain_db.is_finite() {
            return Err(ConfigError::invalid("master.gain_db", "must be finite"));
        }
        Ok(())
    }
}
