//! Configuration manager for TOML file operations
//!
//! This module provides the `ConfigManager` which loads and saves the input
//! settings file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult, Result};
use crate::input::KeyboardLayout;

use super::settings::InputSettings;

/// File name of the input settings
const SETTINGS_FILE: &str = "input.toml";

/// Configuration manager for `Tapdesk`
///
/// Settings are stored in `~/.config/tapdesk/` by default.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Base directory for configuration files
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a new `ConfigManager` with the default configuration directory
    ///
    /// # Errors
    ///
    /// Returns an error if the user configuration directory cannot be
    /// determined.
    pub fn new() -> ConfigResult<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound(PathBuf::from("~/.config")))?
            .join("tapdesk");
        Ok(Self { config_dir })
    }

    /// Creates a new `ConfigManager` with a custom configuration directory
    #[must_use]
    pub const fn with_config_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Returns the configuration directory path
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Returns the path of the settings file
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    /// Ensures the configuration directory exists
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_config_dir(&self) -> ConfigResult<()> {
        if !self.config_dir.exists() {
            fs::create_dir_all(&self.config_dir).map_err(|e| {
                ConfigError::Write(format!(
                    "Failed to create config directory {}: {}",
                    self.config_dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Loads input settings
    ///
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or holds
    /// invalid values.
    pub fn load_settings(&self) -> ConfigResult<InputSettings> {
        let path = self.settings_path();
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(InputSettings::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read {}: {}", path.display(), e)))?;
        let settings: InputSettings = toml::from_str(&content).map_err(|e| {
            ConfigError::Deserialize(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        Self::validate_settings(&settings)?;
        Ok(settings)
    }

    /// Loads the settings, then the keyboard layout they select
    ///
    /// # Errors
    ///
    /// Returns [`TapdeskError::Config`](crate::TapdeskError::Config) for an
    /// unreadable or invalid settings file, and
    /// [`TapdeskError::Layout`](crate::TapdeskError::Layout) if the layout
    /// cannot be loaded.
    pub fn load_keyboard_layout(&self) -> Result<KeyboardLayout> {
        let settings = self.load_settings()?;
        let layout = settings.load_layout()?;
        debug!("Loaded keyboard layout {}", layout.name());
        Ok(layout)
    }

    /// Saves input settings
    ///
    /// Creates the configuration directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or cannot be written.
    pub fn save_settings(&self, settings: &InputSettings) -> ConfigResult<()> {
        Self::validate_settings(settings)?;
        self.ensure_config_dir()?;

        let path = self.settings_path();
        let content = toml::to_string_pretty(settings)
            .map_err(|e| ConfigError::Serialize(format!("Failed to serialize: {e}")))?;
        fs::write(&path, content)
            .map_err(|e| ConfigError::Write(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// Validates input settings
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate_settings(settings: &InputSettings) -> ConfigResult<()> {
        if settings.keyboard.layout.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "keyboard.layout".to_string(),
                reason: "Layout name cannot be empty".to_string(),
            });
        }

        let distance = settings.scroll.distance_per_click;
        if !distance.is_finite() || distance <= 0.0 {
            return Err(ConfigError::Validation {
                field: "scroll.distance_per_click".to_string(),
                reason: format!("Must be a positive number, got {distance}"),
            });
        }

        if settings.scroll.max_repeat == 0 {
            return Err(ConfigError::Validation {
                field: "scroll.max_repeat".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
