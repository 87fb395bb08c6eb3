//! Windows virtual-key codes for RDP key events
//!
//! Keys of the navigation/editing cluster, the right-hand modifiers and a
//! few numpad keys are "extended" keys: on a PC keyboard they carry the E0
//! prefix, and RDP needs the flag to tell them apart from their numpad
//! twins.

#![allow(clippy::unreadable_literal)]

use super::keycodes::*;
use super::modifier::ModifierMask;

/// RDP virtual-key code for a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtualKey {
    /// The virtual-key value
    pub code: u16,
    /// Whether this is an extended key (E0 prefix)
    pub extended: bool,
}

impl VirtualKey {
    /// Creates a new virtual key
    #[must_use]
    pub const fn new(code: u16, extended: bool) -> Self {
        Self { code, extended }
    }

    /// Creates a standard (non-extended) virtual key
    #[must_use]
    pub const fn standard(code: u16) -> Self {
        Self {
            code,
            extended: false,
        }
    }

    /// Creates an extended virtual key (E0 prefix)
    #[must_use]
    pub const fn extended(code: u16) -> Self {
        Self {
            code,
            extended: true,
        }
    }
}

/// VK_CONTROL family: left Ctrl
pub const VK_LCONTROL: VirtualKey = VirtualKey::standard(0xA2);
/// Left Alt
pub const VK_LMENU: VirtualKey = VirtualKey::standard(0xA4);
/// Delete (extended)
pub const VK_DELETE: VirtualKey = VirtualKey::extended(0x2E);

/// Converts a platform key code to an RDP virtual key
///
/// # Example
///
/// ```
/// use tapdesk_core::input::vk::virtual_key_for_key_code;
/// use tapdesk_core::input::keycodes::KEYCODE_MOVE_HOME;
///
/// let home = virtual_key_for_key_code(KEYCODE_MOVE_HOME).unwrap();
/// assert!(home.extended);
/// ```
#[must_use]
pub const fn virtual_key_for_key_code(key_code: u32) -> Option<VirtualKey> {
    let vk = match key_code {
        // Letters and digits share their ASCII values
        KEYCODE_A..=KEYCODE_Z => VirtualKey::standard(0x41 + (key_code - KEYCODE_A) as u16),
        KEYCODE_0..=KEYCODE_9 => VirtualKey::standard(0x30 + (key_code - KEYCODE_0) as u16),
        KEYCODE_NUMPAD_0..=KEYCODE_NUMPAD_9 => {
            VirtualKey::standard(0x60 + (key_code - KEYCODE_NUMPAD_0) as u16)
        }
        KEYCODE_F1..=KEYCODE_F12 => VirtualKey::standard(0x70 + (key_code - KEYCODE_F1) as u16),

        // Special keys
        KEYCODE_DEL => VirtualKey::standard(0x08),
        KEYCODE_TAB => VirtualKey::standard(0x09),
        KEYCODE_ENTER | KEYCODE_DPAD_CENTER => VirtualKey::standard(0x0D),
        KEYCODE_BREAK => VirtualKey::standard(0x13),
        KEYCODE_CAPS_LOCK => VirtualKey::standard(0x14),
        KEYCODE_ESCAPE => VirtualKey::standard(0x1B),
        KEYCODE_SPACE => VirtualKey::standard(0x20),
        KEYCODE_SCROLL_LOCK => VirtualKey::standard(0x91),

        // Navigation and editing cluster (extended)
        KEYCODE_PAGE_UP => VirtualKey::extended(0x21),
        KEYCODE_PAGE_DOWN => VirtualKey::extended(0x22),
        KEYCODE_MOVE_END => VirtualKey::extended(0x23),
        KEYCODE_MOVE_HOME => VirtualKey::extended(0x24),
        KEYCODE_DPAD_LEFT => VirtualKey::extended(0x25),
        KEYCODE_DPAD_UP => VirtualKey::extended(0x26),
        KEYCODE_DPAD_RIGHT => VirtualKey::extended(0x27),
        KEYCODE_DPAD_DOWN => VirtualKey::extended(0x28),
        KEYCODE_SYSRQ => VirtualKey::extended(0x2C),
        KEYCODE_INSERT => VirtualKey::extended(0x2D),
        KEYCODE_FORWARD_DEL => VK_DELETE,
        KEYCODE_MENU => VirtualKey::extended(0x5D),
        KEYCODE_NUM_LOCK => VirtualKey::extended(0x90),

        // Modifiers
        KEYCODE_SHIFT_LEFT => VirtualKey::standard(0xA0),
        KEYCODE_SHIFT_RIGHT => VirtualKey::standard(0xA1),
        KEYCODE_CTRL_LEFT => VK_LCONTROL,
        KEYCODE_CTRL_RIGHT => VirtualKey::extended(0xA3),
        KEYCODE_ALT_LEFT => VK_LMENU,
        KEYCODE_ALT_RIGHT => VirtualKey::extended(0xA5),
        KEYCODE_META_LEFT => VirtualKey::extended(0x5B),
        KEYCODE_META_RIGHT => VirtualKey::extended(0x5C),

        // Numpad operators
        KEYCODE_NUMPAD_MULTIPLY => VirtualKey::standard(0x6A),
        KEYCODE_NUMPAD_ADD => VirtualKey::standard(0x6B),
        KEYCODE_NUMPAD_SUBTRACT => VirtualKey::standard(0x6D),
        KEYCODE_NUMPAD_DOT => VirtualKey::standard(0x6E),
        KEYCODE_NUMPAD_DIVIDE => VirtualKey::extended(0x6F),
        KEYCODE_NUMPAD_ENTER => VirtualKey::extended(0x0D),

        // Punctuation (US OEM keys)
        KEYCODE_SEMICOLON => VirtualKey::standard(0xBA),
        KEYCODE_EQUALS => VirtualKey::standard(0xBB),
        KEYCODE_COMMA => VirtualKey::standard(0xBC),
        KEYCODE_MINUS => VirtualKey::standard(0xBD),
        KEYCODE_PERIOD => VirtualKey::standard(0xBE),
        KEYCODE_SLASH => VirtualKey::standard(0xBF),
        KEYCODE_GRAVE => VirtualKey::standard(0xC0),
        KEYCODE_LEFT_BRACKET => VirtualKey::standard(0xDB),
        KEYCODE_BACKSLASH => VirtualKey::standard(0xDC),
        KEYCODE_RIGHT_BRACKET => VirtualKey::standard(0xDD),
        KEYCODE_APOSTROPHE => VirtualKey::standard(0xDE),

        _ => return None,
    };
    Some(vk)
}

/// Returns the virtual key for a single-bit modifier
#[must_use]
pub const fn modifier_virtual_key(bit: ModifierMask) -> Option<VirtualKey> {
    match bit.key_code() {
        Some(key_code) => virtual_key_for_key_code(key_code),
        None => None,
    }
}

/// Checks if a virtual key is one of the modifier keys
#[must_use]
pub const fn is_modifier_virtual_key(vk: VirtualKey) -> bool {
    matches!(vk.code, 0xA0..=0xA5 | 0x5B | 0x5C)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_and_digit_codes() {
        assert_eq!(virtual_key_for_key_code(KEYCODE_A), Some(VirtualKey::standard(0x41)));
        assert_eq!(virtual_key_for_key_code(KEYCODE_Z), Some(VirtualKey::standard(0x5A)));
        assert_eq!(virtual_key_for_key_code(KEYCODE_0), Some(VirtualKey::standard(0x30)));
        assert_eq!(virtual_key_for_key_code(KEYCODE_F12), Some(VirtualKey::standard(0x7B)));
    }

    #[test]
    fn test_extended_keys() {
        for code in [
            KEYCODE_DPAD_UP,
            KEYCODE_PAGE_DOWN,
            KEYCODE_INSERT,
            KEYCODE_FORWARD_DEL,
            KEYCODE_CTRL_RIGHT,
            KEYCODE_NUMPAD_ENTER,
        ] {
            assert!(virtual_key_for_key_code(code).unwrap().extended, "code {code}");
        }
        assert!(!virtual_key_for_key_code(KEYCODE_CTRL_LEFT).unwrap().extended);
        assert!(!virtual_key_for_key_code(KEYCODE_ENTER).unwrap().extended);
    }

    #[test]
    fn test_modifier_virtual_keys() {
        assert_eq!(modifier_virtual_key(ModifierMask::CTRL_LEFT), Some(VK_LCONTROL));
        assert!(is_modifier_virtual_key(VK_LMENU));
        assert!(!is_modifier_virtual_key(VK_DELETE));
    }

    #[test]
    fn test_unmapped_code() {
        assert_eq!(virtual_key_for_key_code(KEYCODE_UNKNOWN), None);
    }
}
