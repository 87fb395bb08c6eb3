//! Configuration management for `Tapdesk`
//!
//! This module handles loading and saving the input settings in TOML
//! format.

mod manager;
mod settings;

pub use manager::ConfigManager;
pub use settings::{
    ClipboardSettings, InputSettings, KeyboardSettings, PointerSettings, ScrollSettings,
};
