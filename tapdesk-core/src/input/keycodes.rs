//! Platform key codes and character maps
//!
//! The touch shell delivers key events using the platform's key-code
//! numbering (the same numbering Android uses for `KEYCODE_*`). This module
//! names the codes the translators care about and provides the
//! [`CharacterMap`] seam used for Unicode fallback resolution.

use super::modifier::ModifierMask;

/// Unknown key; used by the shell for synthesized text
pub const KEYCODE_UNKNOWN: u32 = 0;
/// Digit 0 (digits 1-9 follow consecutively)
pub const KEYCODE_0: u32 = 7;
/// Digit 9
pub const KEYCODE_9: u32 = 16;
/// D-pad up
pub const KEYCODE_DPAD_UP: u32 = 19;
/// D-pad down
pub const KEYCODE_DPAD_DOWN: u32 = 20;
/// D-pad left
pub const KEYCODE_DPAD_LEFT: u32 = 21;
/// D-pad right
pub const KEYCODE_DPAD_RIGHT: u32 = 22;
/// D-pad center
pub const KEYCODE_DPAD_CENTER: u32 = 23;
/// Letter A (letters B-Z follow consecutively)
pub const KEYCODE_A: u32 = 29;
/// Letter Z
pub const KEYCODE_Z: u32 = 54;
/// Comma
pub const KEYCODE_COMMA: u32 = 55;
/// Period
pub const KEYCODE_PERIOD: u32 = 56;
/// Left Alt
pub const KEYCODE_ALT_LEFT: u32 = 57;
/// Right Alt (AltGr)
pub const KEYCODE_ALT_RIGHT: u32 = 58;
/// Left Shift
pub const KEYCODE_SHIFT_LEFT: u32 = 59;
/// Right Shift
pub const KEYCODE_SHIFT_RIGHT: u32 = 60;
/// Tab
pub const KEYCODE_TAB: u32 = 61;
/// Space
pub const KEYCODE_SPACE: u32 = 62;
/// Enter
pub const KEYCODE_ENTER: u32 = 66;
/// Backspace
pub const KEYCODE_DEL: u32 = 67;
/// Grave accent
pub const KEYCODE_GRAVE: u32 = 68;
/// Minus
pub const KEYCODE_MINUS: u32 = 69;
/// Equals
pub const KEYCODE_EQUALS: u32 = 70;
/// Left bracket
pub const KEYCODE_LEFT_BRACKET: u32 = 71;
/// Right bracket
pub const KEYCODE_RIGHT_BRACKET: u32 = 72;
/// Backslash
pub const KEYCODE_BACKSLASH: u32 = 73;
/// Semicolon
pub const KEYCODE_SEMICOLON: u32 = 74;
/// Apostrophe
pub const KEYCODE_APOSTROPHE: u32 = 75;
/// Slash
pub const KEYCODE_SLASH: u32 = 76;
/// Menu
pub const KEYCODE_MENU: u32 = 82;
/// Page up
pub const KEYCODE_PAGE_UP: u32 = 92;
/// Page down
pub const KEYCODE_PAGE_DOWN: u32 = 93;
/// Escape
pub const KEYCODE_ESCAPE: u32 = 111;
/// Forward delete
pub const KEYCODE_FORWARD_DEL: u32 = 112;
/// Left Ctrl
pub const KEYCODE_CTRL_LEFT: u32 = 113;
/// Right Ctrl
pub const KEYCODE_CTRL_RIGHT: u32 = 114;
/// Caps lock
pub const KEYCODE_CAPS_LOCK: u32 = 115;
/// Scroll lock
pub const KEYCODE_SCROLL_LOCK: u32 = 116;
/// Left Super (Windows/Meta)
pub const KEYCODE_META_LEFT: u32 = 117;
/// Right Super (Windows/Meta)
pub const KEYCODE_META_RIGHT: u32 = 118;
/// Print screen / SysRq
pub const KEYCODE_SYSRQ: u32 = 120;
/// Pause/Break
pub const KEYCODE_BREAK: u32 = 121;
/// Home
pub const KEYCODE_MOVE_HOME: u32 = 122;
/// End
pub const KEYCODE_MOVE_END: u32 = 123;
/// Insert
pub const KEYCODE_INSERT: u32 = 124;
/// F1 (F2-F12 follow consecutively)
pub const KEYCODE_F1: u32 = 131;
/// F12
pub const KEYCODE_F12: u32 = 142;
/// Num lock
pub const KEYCODE_NUM_LOCK: u32 = 143;
/// Numpad 0 (numpad 1-9 follow consecutively)
pub const KEYCODE_NUMPAD_0: u32 = 144;
/// Numpad 9
pub const KEYCODE_NUMPAD_9: u32 = 153;
/// Numpad divide
pub const KEYCODE_NUMPAD_DIVIDE: u32 = 154;
/// Numpad multiply
pub const KEYCODE_NUMPAD_MULTIPLY: u32 = 155;
/// Numpad subtract
pub const KEYCODE_NUMPAD_SUBTRACT: u32 = 156;
/// Numpad add
pub const KEYCODE_NUMPAD_ADD: u32 = 157;
/// Numpad decimal point
pub const KEYCODE_NUMPAD_DOT: u32 = 158;
/// Numpad enter
pub const KEYCODE_NUMPAD_ENTER: u32 = 160;

/// Logical identity of a key event delivered by the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyIdentity {
    /// A physical or on-screen key, by platform key code
    Code(u32),
    /// A synthesized character (soft keyboard text, IME commit)
    Unicode(char),
}

impl std::fmt::Display for KeyIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code(code) => write!(f, "keycode {code}"),
            Self::Unicode(ch) => write!(f, "U+{:04X}", u32::from(*ch)),
        }
    }
}

/// Resolves the character a key produces under a modifier state
///
/// This is the platform character map the shell exposes. Implementations
/// return `None` when the key produces no character for that state.
pub trait CharacterMap: Send + Sync {
    /// Returns the character produced by `key_code` with `meta` applied
    fn char_for(&self, key_code: u32, meta: ModifierMask) -> Option<char>;
}

/// US QWERTY character map
///
/// Produces nothing when Ctrl, Alt or Super is held, like the platform maps
/// do for a plain US keyboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsCharacterMap;

const SHIFTED_DIGITS: [char; 10] = [')', '!', '@', '#', '$', '%', '^', '&', '*', '('];

impl CharacterMap for UsCharacterMap {
    fn char_for(&self, key_code: u32, meta: ModifierMask) -> Option<char> {
        if meta.intersects(ModifierMask::CTRL | ModifierMask::ALT | ModifierMask::SUPER) {
            return None;
        }
        let shift = meta.intersects(ModifierMask::SHIFT);

        match key_code {
            KEYCODE_A..=KEYCODE_Z => {
                let ch = char::from(b'a' + (key_code - KEYCODE_A) as u8);
                Some(if shift { ch.to_ascii_uppercase() } else { ch })
            }
            KEYCODE_0..=KEYCODE_9 => {
                let digit = (key_code - KEYCODE_0) as usize;
                if shift {
                    Some(SHIFTED_DIGITS[digit])
                } else {
                    Some(char::from(b'0' + digit as u8))
                }
            }
            KEYCODE_NUMPAD_0..=KEYCODE_NUMPAD_9 => {
                Some(char::from(b'0' + (key_code - KEYCODE_NUMPAD_0) as u8))
            }
            _ => {
                let (plain, shifted) = match key_code {
                    KEYCODE_SPACE => (' ', ' '),
                    KEYCODE_COMMA => (',', '<'),
                    KEYCODE_PERIOD => ('.', '>'),
                    KEYCODE_GRAVE => ('`', '~'),
                    KEYCODE_MINUS => ('-', '_'),
                    KEYCODE_EQUALS => ('=', '+'),
                    KEYCODE_LEFT_BRACKET => ('[', '{'),
                    KEYCODE_RIGHT_BRACKET => (']', '}'),
                    KEYCODE_BACKSLASH => ('\\', '|'),
                    KEYCODE_SEMICOLON => (';', ':'),
                    KEYCODE_APOSTROPHE => ('\'', '"'),
                    KEYCODE_SLASH => ('/', '?'),
                    KEYCODE_NUMPAD_DIVIDE => ('/', '/'),
                    KEYCODE_NUMPAD_MULTIPLY => ('*', '*'),
                    KEYCODE_NUMPAD_SUBTRACT => ('-', '-'),
                    KEYCODE_NUMPAD_ADD => ('+', '+'),
                    KEYCODE_NUMPAD_DOT => ('.', '.'),
                    _ => return None,
                };
                Some(if shift { shifted } else { plain })
            }
        }
    }
}
