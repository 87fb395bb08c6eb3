//! Input translation for remote sessions
//!
//! This module turns platform key and pointer input into the normalized event
//! stream consumed by the protocol encoders:
//!
//! - [`modifier`]: which modifiers are held locally and which the remote
//!   side has been told about
//! - [`key`]: key codes to keysyms, virtual keys or scancodes
//! - [`pointer`]: device coordinates and buttons to clamped pointer events
//! - [`session`]: [`InputSession`], the entry point the UI layer calls
//!
//! Everything here runs on the UI input thread and is not shared across
//! threads; only the encoder's output handle is.

pub mod key;
pub mod keycodes;
pub mod keysym;
pub mod layout;
pub mod modifier;
pub mod pointer;
mod session;
pub mod vk;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use key::{KeyTranslator, RemoteKey, TranslatedKey};
pub use keycodes::{CharacterMap, KeyIdentity, UsCharacterMap};
pub use layout::{KeyboardLayout, LayoutKey, DEFAULT_LAYOUT};
pub use modifier::{ModifierMask, ModifierState};
pub use pointer::{
    CoordinateTransform, NormalizedPointerEvent, PointerButton, PointerTranslator,
    ScrollDirection, ScrollPolicy,
};
pub use session::InputSession;
pub use vk::VirtualKey;

/// Remote desktop protocol of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteProtocol {
    /// VNC (Remote Framebuffer)
    Rfb,
    /// Remote Desktop Protocol
    Rdp,
    /// SPICE
    Spice,
}

impl RemoteProtocol {
    /// Short protocol name used in logs and errors
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rfb => "RFB",
            Self::Rdp => "RDP",
            Self::Spice => "SPICE",
        }
    }
}

impl fmt::Display for RemoteProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
