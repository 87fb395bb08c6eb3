//! Input settings model
//!
//! This module defines the settings stored in input.toml.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::encoder::PointerMode;
use crate::error::LayoutResult;
use crate::input::{KeyboardLayout, ScrollPolicy, DEFAULT_LAYOUT};

/// Input and clipboard settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSettings {
    /// Keyboard settings
    #[serde(default)]
    pub keyboard: KeyboardSettings,
    /// Pointer settings
    #[serde(default)]
    pub pointer: PointerSettings,
    /// Scroll gesture settings
    #[serde(default)]
    pub scroll: ScrollSettings,
    /// Clipboard settings
    #[serde(default)]
    pub clipboard: ClipboardSettings,
}

impl InputSettings {
    /// Scroll policy built from the scroll section
    #[must_use]
    pub const fn scroll_policy(&self) -> ScrollPolicy {
        ScrollPolicy {
            distance_per_click: self.scroll.distance_per_click,
            max_repeat: self.scroll.max_repeat,
        }
    }

    /// Delay the RDP encoder inserts after a modifier key
    #[must_use]
    pub const fn rdp_modifier_delay(&self) -> Duration {
        Duration::from_millis(self.keyboard.rdp_modifier_delay_ms)
    }

    /// SPICE mouse mode
    #[must_use]
    pub const fn pointer_mode(&self) -> PointerMode {
        if self.pointer.relative {
            PointerMode::Relative
        } else {
            PointerMode::Absolute
        }
    }

    /// Loads the configured keyboard layout
    ///
    /// # Errors
    ///
    /// Returns an error if the layout cannot be found or parsed.
    pub fn load_layout(&self) -> LayoutResult<KeyboardLayout> {
        KeyboardLayout::load(self.keyboard.layouts_dir.as_deref(), &self.keyboard.layout)
    }
}

/// Keyboard settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardSettings {
    /// Layout name, e.g. "en-us"
    #[serde(default = "default_layout")]
    pub layout: String,
    /// Directory searched for layout files before the embedded defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layouts_dir: Option<PathBuf>,
    /// Milliseconds to wait between an RDP modifier and the key it modifies
    #[serde(default = "default_rdp_modifier_delay_ms")]
    pub rdp_modifier_delay_ms: u64,
}

fn default_layout() -> String {
    DEFAULT_LAYOUT.to_string()
}

const fn default_rdp_modifier_delay_ms() -> u64 {
    20
}

impl Default for KeyboardSettings {
    fn default() -> Self {
        Self {
            layout: default_layout(),
            layouts_dir: None,
            rdp_modifier_delay_ms: default_rdp_modifier_delay_ms(),
        }
    }
}

/// Pointer settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerSettings {
    /// Send relative motion to SPICE servers
    #[serde(default)]
    pub relative: bool,
}

/// Scroll gesture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollSettings {
    /// Gesture distance that produces one wheel click
    #[serde(default = "default_distance_per_click")]
    pub distance_per_click: f64,
    /// Maximum wheel clicks per gesture sample
    #[serde(default = "default_max_repeat")]
    pub max_repeat: u32,
}

const fn default_distance_per_click() -> f64 {
    20.0
}

const fn default_max_repeat() -> u32 {
    10
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            distance_per_click: default_distance_per_click(),
            max_repeat: default_max_repeat(),
        }
    }
}

/// Clipboard settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardSettings {
    /// Enable the Extended Clipboard exchange
    #[serde(default = "default_true")]
    pub enabled: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for ClipboardSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}
