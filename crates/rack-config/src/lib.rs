//! Host settings for the rack plugin host.
//!
//! # Features
//!
//! - **Settings File**: [`HostConfig`] loaded from and saved to TOML
//! - **Validation**: sample rate, block size and master level ranges
//! - **Paths**: platform-specific config and plugin directories
//!
//! # Example
//!
//! ```rust,no_run
//! use rack_config::{HostConfig, default_config_path};
//!
//! let mut config = HostConfig::load_default().unwrap();
//! config.routing.mono = true;
//! config.save(default_config_path()).unwrap();
//! ```

mod error;

/// Platform-specific paths for configuration and plugins.
pub mod paths;

/// The host settings file.
pub mod settings;

pub use error::ConfigError;
pub use paths::{
    default_config_path, ensure_user_config_dir, expand_home, user_config_dir, user_plugins_dir,
};
pub use settings::{
    AudioSettings, HostConfig, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE, MasterSettings, PluginSettings,
    RoutingSettings,
};
