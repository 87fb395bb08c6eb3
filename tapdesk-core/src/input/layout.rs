//! SPICE keyboard layout tables
//!
//! SPICE transmits PC/AT scancodes, so the client needs to know which
//! scancodes produce a key or character on the guest's keyboard layout.
//! Layouts are plain text tables loaded once at session start:
//!
//! ```text
//! # <key> <scancode> [<scancode> ...]
//! 29 0x1e          # platform key code 29 (A)
//! U+0041 0x1001e   # character 'A': scancode 0x1e with Shift
//! ```
//!
//! Scancode values carry their modifier requirements in the high bits
//! ([`SCANCODE_SHIFT_FLAG`], [`SCANCODE_ALTGR_FLAG`]); [`split_scancode`]
//! separates them before transmission.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use super::keycodes::{
    KeyIdentity, KEYCODE_ALT_LEFT, KEYCODE_ALT_RIGHT, KEYCODE_CTRL_LEFT, KEYCODE_CTRL_RIGHT,
    KEYCODE_META_LEFT, KEYCODE_META_RIGHT, KEYCODE_SHIFT_LEFT, KEYCODE_SHIFT_RIGHT,
};
use super::modifier::ModifierMask;
use crate::error::{LayoutError, LayoutResult};

/// Name of the layout used when the requested one is unavailable
pub const DEFAULT_LAYOUT: &str = "en-us";

/// Scancode bit requiring Shift to be held
pub const SCANCODE_SHIFT_FLAG: u32 = 0x1_0000;
/// Scancode bit requiring AltGr (right Alt) to be held
pub const SCANCODE_ALTGR_FLAG: u32 = 0x2_0000;
/// Bits of a layout value that form the transmitted scancode
pub const SCANCODE_MASK: u32 = 0xFFFF;

const EMBEDDED_DEFAULT: &str = include_str!("../../layouts/en-us");

/// Composite lookup key: a key code or a character code point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutKey {
    /// Platform key code or Unicode code point
    pub code: u32,
    /// Whether `code` is a synthesized Unicode code point
    pub unicode: bool,
}

impl From<KeyIdentity> for LayoutKey {
    fn from(key: KeyIdentity) -> Self {
        match key {
            KeyIdentity::Code(code) => Self {
                code,
                unicode: false,
            },
            KeyIdentity::Unicode(ch) => Self {
                code: u32::from(ch),
                unicode: true,
            },
        }
    }
}

/// Splits a layout value into the scancode and the modifiers it requires
#[must_use]
pub fn split_scancode(raw: u32) -> (u32, ModifierMask) {
    let mut modifiers = ModifierMask::NONE;
    if raw & SCANCODE_SHIFT_FLAG != 0 {
        modifiers |= ModifierMask::SHIFT_LEFT;
    }
    if raw & SCANCODE_ALTGR_FLAG != 0 {
        modifiers |= ModifierMask::ALT_RIGHT;
    }
    (raw & SCANCODE_MASK, modifiers)
}

/// Returns the scancode for a single-bit modifier
#[must_use]
pub const fn modifier_scancode(bit: ModifierMask) -> Option<u32> {
    let key_code = match bit.key_code() {
        Some(code) => code,
        None => return None,
    };
    let scancode = match key_code {
        KEYCODE_SHIFT_LEFT => 0x2A,
        KEYCODE_SHIFT_RIGHT => 0x36,
        KEYCODE_CTRL_LEFT => 0x1D,
        KEYCODE_CTRL_RIGHT => 0x11D,
        KEYCODE_ALT_LEFT => 0x38,
        KEYCODE_ALT_RIGHT => 0x138,
        KEYCODE_META_LEFT => 0x15B,
        KEYCODE_META_RIGHT => 0x15C,
        _ => return None,
    };
    Some(scancode)
}

/// A parsed keyboard layout table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardLayout {
    name: String,
    entries: HashMap<LayoutKey, Vec<u32>>,
}

impl KeyboardLayout {
    /// Parses a layout table
    ///
    /// Blank lines and `#` comments are ignored. Later entries for the same
    /// key replace earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Parse`] for a malformed line.
    pub fn parse(name: &str, text: &str) -> LayoutResult<Self> {
        let mut entries = HashMap::new();

        for (index, raw_line) in text.lines().enumerate() {
            let line = raw_line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let line_no = index + 1;
            let mut fields = line.split_whitespace();
            let key = fields
                .next()
                .map(|field| parse_key(field, line_no))
                .transpose()?
                .ok_or_else(|| parse_error(line_no, "missing key"))?;

            let scancodes = fields
                .map(|field| parse_scancode(field, line_no))
                .collect::<LayoutResult<Vec<_>>>()?;
            if scancodes.is_empty() {
                return Err(parse_error(line_no, "missing scancode"));
            }
            entries.insert(key, scancodes);
        }

        debug!("Parsed keyboard layout {name} with {} entries", entries.len());
        Ok(Self {
            name: name.to_string(),
            entries,
        })
    }

    /// Returns the built-in default layout
    ///
    /// # Errors
    ///
    /// Returns an error only if the embedded table is corrupt.
    pub fn embedded_default() -> LayoutResult<Self> {
        Self::parse(DEFAULT_LAYOUT, EMBEDDED_DEFAULT)
    }

    /// Loads a layout file named `name` from `dir`
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidName`] if `name` holds a path separator
    /// or `..`, [`LayoutError::NotFound`] if the file does not exist, or a
    /// read/parse error.
    pub fn load_from_dir(dir: &Path, name: &str) -> LayoutResult<Self> {
        if name.contains(['/', '\\']) || name.contains("..") {
            return Err(LayoutError::InvalidName(name.to_string()));
        }
        let path = dir.join(name);
        if !path.is_file() {
            return Err(LayoutError::NotFound(path));
        }
        let text = fs::read_to_string(&path)?;
        Self::parse(name, &text)
    }

    /// Loads the requested layout, falling back to the default layout
    ///
    /// The layout is looked up in `dir` first. When it is missing, the
    /// default layout is used (from `dir` if present, else the built-in
    /// table).
    ///
    /// # Errors
    ///
    /// Returns an error if a layout file exists but cannot be read or parsed.
    pub fn load(dir: Option<&Path>, name: &str) -> LayoutResult<Self> {
        if let Some(dir) = dir {
            match Self::load_from_dir(dir, name) {
                Ok(layout) => return Ok(layout),
                Err(LayoutError::NotFound(path)) => {
                    warn!(
                        "Keyboard layout {} not found, using {DEFAULT_LAYOUT}",
                        path.display()
                    );
                }
                Err(e) => return Err(e),
            }
            match Self::load_from_dir(dir, DEFAULT_LAYOUT) {
                Ok(layout) => return Ok(layout),
                Err(LayoutError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        } else if name != DEFAULT_LAYOUT {
            warn!("No layout directory configured, using built-in {DEFAULT_LAYOUT}");
        }
        Self::embedded_default()
    }

    /// Returns the layout name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the layout has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the raw layout values for a key
    #[must_use]
    pub fn lookup(&self, key: LayoutKey) -> Option<&[u32]> {
        self.entries.get(&key).map(Vec::as_slice)
    }
}

fn parse_error(line: usize, reason: impl Into<String>) -> LayoutError {
    LayoutError::Parse {
        line,
        reason: reason.into(),
    }
}

fn parse_key(field: &str, line: usize) -> LayoutResult<LayoutKey> {
    if let Some(hex) = field.strip_prefix("U+").or_else(|| field.strip_prefix("u+")) {
        let code = u32::from_str_radix(hex, 16)
            .map_err(|e| parse_error(line, format!("invalid code point {field}: {e}")))?;
        if char::from_u32(code).is_none() {
            return Err(parse_error(line, format!("{field} is not a character")));
        }
        return Ok(LayoutKey {
            code,
            unicode: true,
        });
    }
    let code = field
        .parse::<u32>()
        .map_err(|e| parse_error(line, format!("invalid key code {field}: {e}")))?;
    Ok(LayoutKey {
        code,
        unicode: false,
    })
}

fn parse_scancode(field: &str, line: usize) -> LayoutResult<u32> {
    let digits = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
        .ok_or_else(|| parse_error(line, format!("scancode {field} must be hex (0x..)")))?;
    let value = u32::from_str_radix(digits, 16)
        .map_err(|e| parse_error(line, format!("invalid scancode {field}: {e}")))?;
    if value & SCANCODE_MASK == 0 {
        return Err(parse_error(line, format!("scancode {field} is zero")));
    }
    Ok(value)
}
