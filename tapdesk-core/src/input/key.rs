//! Key translation into protocol code spaces
//!
//! A [`KeyTranslator`] turns a platform key identity plus the live modifier
//! mask into the protocol-specific codes to transmit:
//!
//! - RFB: X11 keysyms, with Unicode fallback through the character map
//! - RDP: Windows virtual-key codes with the extended-key flag
//! - SPICE: scancodes from the session's keyboard layout table
//!
//! An empty translation means the key has no remote equivalent; the event is
//! dropped.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::keycodes::{CharacterMap, KeyIdentity};
use super::keysym::{keysym_for_char, keysym_for_key_code, modifier_keysym};
use super::layout::{modifier_scancode, split_scancode, KeyboardLayout, LayoutKey};
use super::modifier::ModifierMask;
use super::vk::{modifier_virtual_key, virtual_key_for_key_code, VirtualKey};
use super::RemoteProtocol;

/// A key in one of the protocol code spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteKey {
    /// X11 keysym (RFB)
    Keysym(u32),
    /// Windows virtual key (RDP)
    VirtualKey(VirtualKey),
    /// Unicode character event (RDP)
    Unicode(char),
    /// PC/AT scancode, 0x100 marking the E0 prefix (SPICE)
    Scancode(u32),
}

impl fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keysym(keysym) => write!(f, "keysym {keysym:#06x}"),
            Self::VirtualKey(vk) if vk.extended => write!(f, "vk {:#04x} (extended)", vk.code),
            Self::VirtualKey(vk) => write!(f, "vk {:#04x}", vk.code),
            Self::Unicode(ch) => write!(f, "unicode U+{:04X}", u32::from(*ch)),
            Self::Scancode(scancode) => write!(f, "scancode {scancode:#04x}"),
        }
    }
}

/// One code to transmit, with the modifiers it needs on top of the
/// modifiers already in effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslatedKey {
    /// The protocol key
    pub key: RemoteKey,
    /// Modifiers that must be held while the key is sent
    pub modifiers: ModifierMask,
}

impl TranslatedKey {
    /// A key needing no additional modifiers
    #[must_use]
    pub const fn plain(key: RemoteKey) -> Self {
        Self {
            key,
            modifiers: ModifierMask::NONE,
        }
    }
}

/// Converts platform key identities into protocol key codes
#[derive(Clone)]
pub struct KeyTranslator {
    protocol: RemoteProtocol,
    char_map: Arc<dyn CharacterMap>,
    layout: Option<Arc<KeyboardLayout>>,
}

impl fmt::Debug for KeyTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyTranslator")
            .field("protocol", &self.protocol)
            .field("layout", &self.layout.as_ref().map(|l| l.name().to_string()))
            .finish_non_exhaustive()
    }
}

impl KeyTranslator {
    /// Creates a translator producing X11 keysyms
    #[must_use]
    pub fn rfb(char_map: Arc<dyn CharacterMap>) -> Self {
        Self {
            protocol: RemoteProtocol::Rfb,
            char_map,
            layout: None,
        }
    }

    /// Creates a translator producing virtual keys
    #[must_use]
    pub fn rdp(char_map: Arc<dyn CharacterMap>) -> Self {
        Self {
            protocol: RemoteProtocol::Rdp,
            char_map,
            layout: None,
        }
    }

    /// Creates a translator producing scancodes from a layout table
    #[must_use]
    pub fn spice(layout: Arc<KeyboardLayout>, char_map: Arc<dyn CharacterMap>) -> Self {
        Self {
            protocol: RemoteProtocol::Spice,
            char_map,
            layout: Some(layout),
        }
    }

    /// Returns the target protocol
    #[must_use]
    pub const fn protocol(&self) -> RemoteProtocol {
        self.protocol
    }

    /// Translates a key event
    ///
    /// Returns an empty vector when no mapping exists through any fallback.
    #[must_use]
    pub fn translate(&self, key: KeyIdentity, meta: ModifierMask) -> Vec<TranslatedKey> {
        let translated = match self.protocol {
            RemoteProtocol::Rfb => self.translate_rfb(key, meta),
            RemoteProtocol::Rdp => self.translate_rdp(key, meta),
            RemoteProtocol::Spice => self.translate_spice(key, meta),
        };
        if translated.is_empty() {
            trace!("[{}] No mapping for {key} (meta {meta}), dropping", self.protocol);
        }
        translated
    }

    /// Returns the protocol key for a single-bit modifier
    #[must_use]
    pub const fn modifier_key(&self, bit: ModifierMask) -> Option<RemoteKey> {
        match self.protocol {
            RemoteProtocol::Rfb => match modifier_keysym(bit) {
                Some(keysym) => Some(RemoteKey::Keysym(keysym)),
                None => None,
            },
            RemoteProtocol::Rdp => match modifier_virtual_key(bit) {
                Some(vk) => Some(RemoteKey::VirtualKey(vk)),
                None => None,
            },
            RemoteProtocol::Spice => match modifier_scancode(bit) {
                Some(scancode) => Some(RemoteKey::Scancode(scancode)),
                None => None,
            },
        }
    }

    fn translate_rfb(&self, key: KeyIdentity, meta: ModifierMask) -> Vec<TranslatedKey> {
        let code = match key {
            KeyIdentity::Unicode(ch) => {
                return keysym_for_char(ch)
                    .map(|keysym| TranslatedKey::plain(RemoteKey::Keysym(keysym)))
                    .into_iter()
                    .collect();
            }
            KeyIdentity::Code(code) => code,
        };

        if let Some(keysym) = keysym_for_key_code(code) {
            return vec![TranslatedKey::plain(RemoteKey::Keysym(keysym))];
        }

        // Full modifiers first
        if let Some(keysym) = self.char_map.char_for(code, meta).and_then(keysym_for_char) {
            return vec![TranslatedKey::plain(RemoteKey::Keysym(keysym))];
        }

        // Alt commonly suppresses the character; resolve without it and send
        // Alt explicitly instead.
        let alt = meta & ModifierMask::ALT;
        if !alt.is_empty() {
            if let Some(keysym) = self
                .char_map
                .char_for(code, meta - ModifierMask::ALT)
                .and_then(keysym_for_char)
            {
                return vec![TranslatedKey {
                    key: RemoteKey::Keysym(keysym),
                    modifiers: alt,
                }];
            }
        }
        Vec::new()
    }

    fn translate_rdp(&self, key: KeyIdentity, meta: ModifierMask) -> Vec<TranslatedKey> {
        match key {
            KeyIdentity::Code(code) => {
                if let Some(vk) = virtual_key_for_key_code(code) {
                    return vec![TranslatedKey::plain(RemoteKey::VirtualKey(vk))];
                }
                self.char_map
                    .char_for(code, meta)
                    .map(|ch| TranslatedKey::plain(RemoteKey::Unicode(ch)))
                    .into_iter()
                    .collect()
            }
            KeyIdentity::Unicode('\n' | '\r') => {
                vec![TranslatedKey::plain(RemoteKey::VirtualKey(VirtualKey::standard(0x0D)))]
            }
            KeyIdentity::Unicode(ch) if ch.is_control() => Vec::new(),
            KeyIdentity::Unicode(ch) => vec![TranslatedKey::plain(RemoteKey::Unicode(ch))],
        }
    }

    fn translate_spice(&self, key: KeyIdentity, meta: ModifierMask) -> Vec<TranslatedKey> {
        if let KeyIdentity::Code(code) = key {
            if let Some(scancode) = ModifierMask::from_key_code(code).and_then(modifier_scancode) {
                return vec![TranslatedKey::plain(RemoteKey::Scancode(scancode))];
            }
        }
        let Some(layout) = self.layout.as_deref() else {
            return Vec::new();
        };

        let raw = layout.lookup(LayoutKey::from(key)).or_else(|| match key {
            KeyIdentity::Code(code) => self
                .char_map
                .char_for(code, meta)
                .and_then(|ch| layout.lookup(LayoutKey::from(KeyIdentity::Unicode(ch)))),
            KeyIdentity::Unicode(_) => None,
        });

        raw.unwrap_or_default()
            .iter()
            .map(|value| {
                let (scancode, modifiers) = split_scancode(*value);
                TranslatedKey {
                    key: RemoteKey::Scancode(scancode),
                    modifiers,
                }
            })
            .collect()
    }
}
