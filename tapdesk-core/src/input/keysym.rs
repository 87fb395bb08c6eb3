//! X11 keysyms for RFB key events
//!
//! RFB key events carry X11 keysyms. Named keys map through a fixed table;
//! printable characters map to Latin-1 keysyms directly or to the Unicode
//! keysym range (`0x0100_0000 | codepoint`).

use super::keycodes::*;
use super::modifier::ModifierMask;

/// Keysym for BackSpace
pub const XK_BACKSPACE: u32 = 0xFF08;
/// Keysym for Tab
pub const XK_TAB: u32 = 0xFF09;
/// Keysym for Return
pub const XK_RETURN: u32 = 0xFF0D;
/// Keysym for Escape
pub const XK_ESCAPE: u32 = 0xFF1B;
/// Keysym for Delete
pub const XK_DELETE: u32 = 0xFFFF;
/// Keysym for Left Control
pub const XK_CONTROL_L: u32 = 0xFFE3;
/// Keysym for Left Alt
pub const XK_ALT_L: u32 = 0xFFE9;

/// Offset of the Unicode keysym range
const UNICODE_KEYSYM_BASE: u32 = 0x0100_0000;

/// Returns the keysym for a named (non-character) platform key
#[must_use]
pub const fn keysym_for_key_code(key_code: u32) -> Option<u32> {
    let keysym = match key_code {
        KEYCODE_DPAD_UP => 0xFF52,
        KEYCODE_DPAD_DOWN => 0xFF54,
        KEYCODE_DPAD_LEFT => 0xFF51,
        KEYCODE_DPAD_RIGHT => 0xFF53,
        KEYCODE_DPAD_CENTER | KEYCODE_ENTER => XK_RETURN,
        KEYCODE_NUMPAD_ENTER => 0xFF8D,
        KEYCODE_TAB => XK_TAB,
        KEYCODE_DEL => XK_BACKSPACE,
        KEYCODE_FORWARD_DEL => XK_DELETE,
        KEYCODE_ESCAPE => XK_ESCAPE,
        KEYCODE_MENU => 0xFF67,
        KEYCODE_PAGE_UP => 0xFF55,
        KEYCODE_PAGE_DOWN => 0xFF56,
        KEYCODE_MOVE_HOME => 0xFF50,
        KEYCODE_MOVE_END => 0xFF57,
        KEYCODE_INSERT => 0xFF63,
        KEYCODE_SYSRQ => 0xFF61,
        KEYCODE_BREAK => 0xFF13,
        KEYCODE_CAPS_LOCK => 0xFFE5,
        KEYCODE_NUM_LOCK => 0xFF7F,
        KEYCODE_SCROLL_LOCK => 0xFF14,
        KEYCODE_F1..=KEYCODE_F12 => 0xFFBE + (key_code - KEYCODE_F1),
        KEYCODE_SHIFT_LEFT => 0xFFE1,
        KEYCODE_SHIFT_RIGHT => 0xFFE2,
        KEYCODE_CTRL_LEFT => XK_CONTROL_L,
        KEYCODE_CTRL_RIGHT => 0xFFE4,
        KEYCODE_ALT_LEFT => XK_ALT_L,
        KEYCODE_ALT_RIGHT => 0xFFEA,
        KEYCODE_META_LEFT => 0xFFEB,
        KEYCODE_META_RIGHT => 0xFFEC,
        _ => return None,
    };
    Some(keysym)
}

/// Returns the keysym for a single-bit modifier
#[must_use]
pub const fn modifier_keysym(bit: ModifierMask) -> Option<u32> {
    match bit.key_code() {
        Some(key_code) => keysym_for_key_code(key_code),
        None => None,
    }
}

/// Converts a character to its keysym
///
/// Control characters with a keyboard equivalent (newline, tab, backspace,
/// escape) map to their function keysyms; other control characters have
/// no keysym.
#[must_use]
pub fn keysym_for_char(ch: char) -> Option<u32> {
    let code = u32::from(ch);
    match ch {
        '\n' | '\r' => Some(XK_RETURN),
        '\t' => Some(XK_TAB),
        '\u{8}' => Some(XK_BACKSPACE),
        '\u{1b}' => Some(XK_ESCAPE),
        '\u{7f}' => Some(XK_DELETE),
        _ if ch.is_control() => None,
        // Latin-1 maps directly
        _ if code <= 0xFF => Some(code),
        _ => Some(UNICODE_KEYSYM_BASE | code),
    }
}

/// Checks if a keysym is one of the modifier keysyms
#[must_use]
pub const fn is_modifier_keysym(keysym: u32) -> bool {
    matches!(keysym, 0xFFE1..=0xFFE4 | 0xFFE9..=0xFFEC)
}
