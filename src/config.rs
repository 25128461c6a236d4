//! Device configuration
//!
//! Loaded from TOML (usually `~/.config/opengamepad/gamepad.toml`) and handed
//! to the device as an `Arc<GamepadConfig>`, so the device can never outlive
//! the configuration it reads its dispatch policy from.

use crate::error::GamepadError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_DIR: &str = "opengamepad";
const CONFIG_FILE: &str = "gamepad.toml";

/// Dispatch policy and report ids for one virtual gamepad
///
/// # Examples
///
/// ```rust
/// use opengamepad::config::GamepadConfig;
///
/// let config = GamepadConfig::from_toml_str("auto_defer = true").unwrap();
/// assert!(config.auto_report);
/// assert!(config.auto_defer);
/// ```
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct GamepadConfig {
    /// Send a report after every state-changing call
    pub auto_report: bool,

    /// Queue every send on the deferred work queue instead of sending inline
    pub auto_defer: bool,

    /// Report id of the device-to-host input report
    pub input_report_id: u8,

    /// Report id of the host-to-device vibration report
    pub output_report_id: u8,

    /// Capacity of the deferred work queue
    pub deferred_queue_capacity: usize,
}

impl Default for GamepadConfig {
    fn default() -> Self {
        Self {
            auto_report: true,
            auto_defer: false,
            input_report_id: 0x01,
            output_report_id: 0x03,
            deferred_queue_capacity: 32,
        }
    }
}

impl GamepadConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, GamepadError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| GamepadError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, GamepadError> {
        toml::to_string_pretty(self)
            .map_err(|e| GamepadError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Reads and validates the config file at `path`
    pub fn load(path: &Path) -> Result<Self, GamepadError> {
        debug!("Loading gamepad config from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| {
            GamepadError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// `<config dir>/opengamepad/gamepad.toml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push(CONFIG_DIR);
            path.push(CONFIG_FILE);
            path
        })
    }

    /// Loads the default config file, falling back to defaults when it is missing
    pub fn load_or_default() -> Result<Self, GamepadError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                info!("No config directory available, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), GamepadError> {
        if self.deferred_queue_capacity == 0 {
            return Err(GamepadError::Config(
                "deferred_queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.input_report_id == self.output_report_id {
            return Err(GamepadError::Config(format!(
                "input and output report share id {:#04x}",
                self.input_report_id
            )));
        }
        Ok(())
    }
}
