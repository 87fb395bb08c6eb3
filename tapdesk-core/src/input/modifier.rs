//! Modifier key state tracking
//!
//! Three masks are tracked per session:
//!
//! - `hardware`: modifiers whose physical keys are currently held
//! - `software`: modifiers latched by on-screen toggle buttons
//! - `remote`: modifiers the remote peer has been told are down
//!
//! The state is pure bookkeeping. [`InputSession`](super::InputSession)
//! queries it to decide which modifier transitions must be transmitted
//! around each key or pointer event and records every transition it sends.

use std::fmt;

use bitflags::bitflags;

use super::keycodes::{
    KEYCODE_ALT_LEFT, KEYCODE_ALT_RIGHT, KEYCODE_CTRL_LEFT, KEYCODE_CTRL_RIGHT,
    KEYCODE_META_LEFT, KEYCODE_META_RIGHT, KEYCODE_SHIFT_LEFT, KEYCODE_SHIFT_RIGHT,
};

bitflags! {
    /// Bitset over {Shift, Ctrl, Alt, Super} x {Left, Right}
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModifierMask: u8 {
        /// Left Shift
        const SHIFT_LEFT = 1 << 0;
        /// Right Shift
        const SHIFT_RIGHT = 1 << 1;
        /// Left Ctrl
        const CTRL_LEFT = 1 << 2;
        /// Right Ctrl
        const CTRL_RIGHT = 1 << 3;
        /// Left Alt
        const ALT_LEFT = 1 << 4;
        /// Right Alt (AltGr)
        const ALT_RIGHT = 1 << 5;
        /// Left Super
        const SUPER_LEFT = 1 << 6;
        /// Right Super
        const SUPER_RIGHT = 1 << 7;
    }
}

impl ModifierMask {
    /// No modifiers
    pub const NONE: Self = Self::empty();
    /// Either Shift
    pub const SHIFT: Self = Self::SHIFT_LEFT.union(Self::SHIFT_RIGHT);
    /// Either Ctrl
    pub const CTRL: Self = Self::CTRL_LEFT.union(Self::CTRL_RIGHT);
    /// Either Alt
    pub const ALT: Self = Self::ALT_LEFT.union(Self::ALT_RIGHT);
    /// Either Super
    pub const SUPER: Self = Self::SUPER_LEFT.union(Self::SUPER_RIGHT);

    /// Single-bit modifiers in transmission order (Ctrl, Alt, Shift, Super)
    pub const SINGLE_BITS: [Self; 8] = [
        Self::CTRL_LEFT,
        Self::CTRL_RIGHT,
        Self::ALT_LEFT,
        Self::ALT_RIGHT,
        Self::SHIFT_LEFT,
        Self::SHIFT_RIGHT,
        Self::SUPER_LEFT,
        Self::SUPER_RIGHT,
    ];

    /// Iterates over the single-bit modifiers set, in transmission order
    pub fn iter_ordered(self) -> impl Iterator<Item = Self> {
        Self::SINGLE_BITS
            .into_iter()
            .filter(move |bit| self.contains(*bit))
    }

    /// Maps a platform modifier key code to its modifier bit
    #[must_use]
    pub const fn from_key_code(key_code: u32) -> Option<Self> {
        match key_code {
            KEYCODE_SHIFT_LEFT => Some(Self::SHIFT_LEFT),
            KEYCODE_SHIFT_RIGHT => Some(Self::SHIFT_RIGHT),
            KEYCODE_CTRL_LEFT => Some(Self::CTRL_LEFT),
            KEYCODE_CTRL_RIGHT => Some(Self::CTRL_RIGHT),
            KEYCODE_ALT_LEFT => Some(Self::ALT_LEFT),
            KEYCODE_ALT_RIGHT => Some(Self::ALT_RIGHT),
            KEYCODE_META_LEFT => Some(Self::SUPER_LEFT),
            KEYCODE_META_RIGHT => Some(Self::SUPER_RIGHT),
            _ => None,
        }
    }

    /// Platform key code of a single-bit modifier
    #[must_use]
    pub const fn key_code(self) -> Option<u32> {
        let key_code = match self.bits() {
            0b0000_0001 => KEYCODE_SHIFT_LEFT,
            0b0000_0010 => KEYCODE_SHIFT_RIGHT,
            0b0000_0100 => KEYCODE_CTRL_LEFT,
            0b0000_1000 => KEYCODE_CTRL_RIGHT,
            0b0001_0000 => KEYCODE_ALT_LEFT,
            0b0010_0000 => KEYCODE_ALT_RIGHT,
            0b0100_0000 => KEYCODE_META_LEFT,
            0b1000_0000 => KEYCODE_META_RIGHT,
            _ => return None,
        };
        Some(key_code)
    }

    const fn name(self) -> &'static str {
        match self.bits() {
            0b0000_0001 => "Shift_L",
            0b0000_0010 => "Shift_R",
            0b0000_0100 => "Control_L",
            0b0000_1000 => "Control_R",
            0b0001_0000 => "Alt_L",
            0b0010_0000 => "Alt_R",
            0b0100_0000 => "Super_L",
            0b1000_0000 => "Super_R",
            _ => "?",
        }
    }
}

impl fmt::Display for ModifierMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for bit in self.iter_ordered() {
            if !first {
                f.write_str("+")?;
            }
            f.write_str(bit.name())?;
            first = false;
        }
        Ok(())
    }
}

/// Per-session modifier bookkeeping
///
/// Invariant: `remote` only holds bits for which a "down" was transmitted
/// and not yet followed by an "up".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    hardware: ModifierMask,
    software: ModifierMask,
    remote: ModifierMask,
}

impl ModifierState {
    /// Creates an empty modifier state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a physical modifier key transition
    ///
    /// Returns the affected modifier bit, or `None` for codes that are not
    /// modifier keys (those are ignored).
    pub fn note_hardware_transition(&mut self, key_code: u32, down: bool) -> Option<ModifierMask> {
        let bit = ModifierMask::from_key_code(key_code)?;
        self.hardware.set(bit, down);
        Some(bit)
    }

    /// Decides whether a modifier transition must be transmitted
    ///
    /// `software` is the set of modifiers the caller wants asserted for the
    /// event being sent. A "down" is due when the bit is wanted, the remote
    /// side does not hold it and no physical key holds it (the physical key
    /// sends its own event). An "up" is due when the remote side holds the
    /// bit, the caller no longer wants it and no physical key holds it.
    #[must_use]
    pub const fn should_send_modifier(
        &self,
        software: ModifierMask,
        bit: ModifierMask,
        down: bool,
    ) -> bool {
        if self.hardware.intersects(bit) {
            return false;
        }
        let wanted = software.intersects(bit);
        let remote = self.remote.intersects(bit);
        if down {
            wanted && !remote
        } else {
            remote && !wanted
        }
    }

    /// Records that a modifier transition was transmitted
    pub fn update_remote_mask(&mut self, bit: ModifierMask, down: bool) {
        self.remote.set(bit, down);
    }

    /// Latches or unlatches an on-screen modifier toggle
    pub fn set_software(&mut self, bit: ModifierMask, on: bool) {
        self.software.set(bit, on);
    }

    /// Modifiers that must be sent down before an event wanting `wanted`
    #[must_use]
    pub fn pending_downs(&self, wanted: ModifierMask) -> Vec<ModifierMask> {
        wanted
            .iter_ordered()
            .filter(|bit| self.should_send_modifier(wanted, *bit, true))
            .collect()
    }

    /// Modifiers that must be sent up once only `wanted` remains asserted
    #[must_use]
    pub fn pending_ups(&self, wanted: ModifierMask) -> Vec<ModifierMask> {
        self.remote
            .iter_ordered()
            .filter(|bit| self.should_send_modifier(wanted, *bit, false))
            .collect()
    }

    /// Modifiers physically held
    #[must_use]
    pub const fn hardware(&self) -> ModifierMask {
        self.hardware
    }

    /// Modifiers latched by on-screen toggles
    #[must_use]
    pub const fn software(&self) -> ModifierMask {
        self.software
    }

    /// Modifiers the remote side believes are down
    #[must_use]
    pub const fn remote(&self) -> ModifierMask {
        self.remote
    }

    /// Forgets everything, e.g. after the session was re-established
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_operations() {
        let mask = ModifierMask::CTRL_LEFT | ModifierMask::SHIFT_RIGHT;
        assert!(mask.contains(ModifierMask::CTRL_LEFT));
        assert!(mask.intersects(ModifierMask::SHIFT));
        assert!(!mask.contains(ModifierMask::SHIFT));
        assert_eq!(mask - ModifierMask::CTRL, ModifierMask::SHIFT_RIGHT);
        assert_eq!(mask.iter_ordered().count(), 2);
        assert_eq!(
            mask.iter_ordered().collect::<Vec<_>>(),
            vec![ModifierMask::CTRL_LEFT, ModifierMask::SHIFT_RIGHT]
        );
    }

    #[test]
    fn test_key_code_round_trip() {
        for bit in ModifierMask::SINGLE_BITS {
            let code = bit.key_code().unwrap();
            assert_eq!(ModifierMask::from_key_code(code), Some(bit));
        }
        assert_eq!(ModifierMask::SHIFT.key_code(), None);
        assert_eq!(ModifierMask::NONE.key_code(), None);
    }

    #[test]
    fn test_mask_display() {
        let mask = ModifierMask::SHIFT_LEFT | ModifierMask::CTRL_LEFT;
        assert_eq!(mask.to_string(), "Control_L+Shift_L");
        assert_eq!(ModifierMask::NONE.to_string(), "none");
    }

    #[test]
    fn test_unrecognized_hardware_code_is_ignored() {
        let mut state = ModifierState::new();
        assert_eq!(state.note_hardware_transition(29, true), None);
        assert_eq!(state, ModifierState::new());
    }

    #[test]
    fn test_hardware_transition() {
        let mut state = ModifierState::new();
        let bit = state.note_hardware_transition(KEYCODE_CTRL_LEFT, true);
        assert_eq!(bit, Some(ModifierMask::CTRL_LEFT));
        assert_eq!(state.hardware(), ModifierMask::CTRL_LEFT);

        state.note_hardware_transition(KEYCODE_CTRL_LEFT, false);
        assert!(state.hardware().is_empty());
    }

    #[test]
    fn test_no_duplicate_down() {
        let mut state = ModifierState::new();
        let ctrl = ModifierMask::CTRL_LEFT;
        assert!(state.should_send_modifier(ctrl, ctrl, true));
        state.update_remote_mask(ctrl, true);
        assert!(!state.should_send_modifier(ctrl, ctrl, true));
    }

    #[test]
    fn test_hardware_suppresses_software_down() {
        let mut state = ModifierState::new();
        state.note_hardware_transition(KEYCODE_SHIFT_LEFT, true);
        let shift = ModifierMask::SHIFT_LEFT;
        assert!(!state.should_send_modifier(shift, shift, true));
    }

    #[test]
    fn test_up_only_when_remote_holds_bit() {
        let mut state = ModifierState::new();
        let alt = ModifierMask::ALT_LEFT;
        assert!(!state.should_send_modifier(ModifierMask::NONE, alt, false));

        state.update_remote_mask(alt, true);
        assert!(state.should_send_modifier(ModifierMask::NONE, alt, false));
        assert!(!state.should_send_modifier(alt, alt, false));

        state.note_hardware_transition(KEYCODE_ALT_LEFT, true);
        assert!(!state.should_send_modifier(ModifierMask::NONE, alt, false));
    }

    #[test]
    fn test_pending_transitions() {
        let mut state = ModifierState::new();
        let wanted = ModifierMask::CTRL_LEFT | ModifierMask::SHIFT_LEFT;
        assert_eq!(
            state.pending_downs(wanted),
            vec![ModifierMask::CTRL_LEFT, ModifierMask::SHIFT_LEFT]
        );
        for bit in state.pending_downs(wanted) {
            state.update_remote_mask(bit, true);
        }
        assert!(state.pending_downs(wanted).is_empty());
        assert_eq!(state.pending_ups(ModifierMask::SHIFT_LEFT), vec![ModifierMask::CTRL_LEFT]);
    }
}
