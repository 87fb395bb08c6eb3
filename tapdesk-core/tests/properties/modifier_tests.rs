//! Property tests for modifier bookkeeping
//!
//! Random interleavings of physical modifier keys, on-screen toggles, key
//! presses and pointer presses must leave the remote side with no modifier
//! down once everything is released, and must never send a modifier down
//! twice.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use tapdesk_core::input::keycodes::{
    KEYCODE_A, KEYCODE_ALT_LEFT, KEYCODE_ALT_RIGHT, KEYCODE_CTRL_LEFT, KEYCODE_CTRL_RIGHT,
    KEYCODE_META_LEFT, KEYCODE_SHIFT_LEFT, KEYCODE_SHIFT_RIGHT, KEYCODE_Z,
};
use tapdesk_core::input::{KeyTranslator, UsCharacterMap};
use tapdesk_core::{KeyIdentity, ModifierMask, ModifierState, PointerButton, RemoteKey};

use super::{rfb_session, written, RfbEvent};

const MODIFIER_CODES: [u32; 7] = [
    KEYCODE_SHIFT_LEFT,
    KEYCODE_SHIFT_RIGHT,
    KEYCODE_CTRL_LEFT,
    KEYCODE_CTRL_RIGHT,
    KEYCODE_ALT_LEFT,
    KEYCODE_ALT_RIGHT,
    KEYCODE_META_LEFT,
];

#[derive(Debug, Clone, Copy)]
enum Op {
    HardwareDown(u32),
    HardwareUp(u32),
    SoftwareOn(ModifierMask),
    SoftwareOff(ModifierMask),
    KeyDown(u32),
    KeyUp(u32),
    PointerDown(PointerButton),
    PointerRelease,
}

fn arb_modifier_code() -> impl Strategy<Value = u32> {
    prop::sample::select(MODIFIER_CODES.to_vec())
}

fn arb_modifier_bit() -> impl Strategy<Value = ModifierMask> {
    prop::sample::select(ModifierMask::SINGLE_BITS.to_vec())
}

fn arb_letter() -> impl Strategy<Value = u32> {
    KEYCODE_A..=KEYCODE_Z
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        arb_modifier_code().prop_map(Op::HardwareDown),
        arb_modifier_code().prop_map(Op::HardwareUp),
        arb_modifier_bit().prop_map(Op::SoftwareOn),
        arb_modifier_bit().prop_map(Op::SoftwareOff),
        arb_letter().prop_map(Op::KeyDown),
        arb_letter().prop_map(Op::KeyUp),
        prop_oneof![Just(PointerButton::Left), Just(PointerButton::Right)]
            .prop_map(Op::PointerDown),
        Just(Op::PointerRelease),
    ]
}

fn modifier_keysyms() -> HashSet<u32> {
    let keys = KeyTranslator::rfb(Arc::new(UsCharacterMap));
    ModifierMask::SINGLE_BITS
        .iter()
        .filter_map(|bit| match keys.modifier_key(*bit) {
            Some(RemoteKey::Keysym(keysym)) => Some(keysym),
            _ => None,
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_modifiers_settle_to_none(ops in prop::collection::vec(arb_op(), 0..40)) {
        let (mut session, output) = rfb_session();
        let mut hardware = HashSet::new();
        let mut software = HashSet::new();
        let mut letters = HashSet::new();

        for op in ops {
            match op {
                Op::HardwareDown(code) => {
                    hardware.insert(code);
                    session.key_down(KeyIdentity::Code(code), ModifierMask::NONE).unwrap();
                }
                Op::HardwareUp(code) => {
                    hardware.remove(&code);
                    session.key_up(KeyIdentity::Code(code), ModifierMask::NONE).unwrap();
                }
                Op::SoftwareOn(bit) => {
                    software.insert(bit);
                    session.set_software_modifier(bit, true).unwrap();
                }
                Op::SoftwareOff(bit) => {
                    software.remove(&bit);
                    session.set_software_modifier(bit, false).unwrap();
                }
                Op::KeyDown(code) => {
                    letters.insert(code);
                    session.key_down(KeyIdentity::Code(code), ModifierMask::NONE).unwrap();
                }
                Op::KeyUp(code) => {
                    letters.remove(&code);
                    session.key_up(KeyIdentity::Code(code), ModifierMask::NONE).unwrap();
                }
                Op::PointerDown(button) => {
                    session.pointer_down(button, 10.0, 10.0, ModifierMask::NONE).unwrap();
                }
                Op::PointerRelease => {
                    session.pointer_release(10.0, 10.0, ModifierMask::NONE).unwrap();
                }
            }
        }

        for code in letters {
            session.key_up(KeyIdentity::Code(code), ModifierMask::NONE).unwrap();
        }
        for code in hardware {
            session.key_up(KeyIdentity::Code(code), ModifierMask::NONE).unwrap();
        }
        for bit in software {
            session.set_software_modifier(bit, false).unwrap();
        }
        if session.pointer().held_button().is_some() {
            session.pointer_release(10.0, 10.0, ModifierMask::NONE).unwrap();
        }

        prop_assert!(session.modifiers().hardware().is_empty());
        prop_assert!(session.modifiers().software().is_empty());
        prop_assert!(session.modifiers().remote().is_empty());

        // The wire agrees: every modifier sent down was sent up, and no
        // modifier was sent down while already down
        let modifiers = modifier_keysyms();
        let mut down = HashSet::new();
        for event in written(&output) {
            if let RfbEvent::Key { keysym, down: pressed } = event {
                if !modifiers.contains(&keysym) {
                    continue;
                }
                if pressed {
                    prop_assert!(down.insert(keysym), "duplicate down of {keysym:#x}");
                } else {
                    prop_assert!(down.remove(&keysym), "up of {keysym:#x} without down");
                }
            }
        }
        prop_assert!(down.is_empty());
    }

    #[test]
    fn prop_no_duplicate_modifier_down(
        software in any::<u8>(),
        hardware in prop::collection::vec(arb_modifier_code(), 0..4),
        bit in arb_modifier_bit(),
    ) {
        let software = ModifierMask::from_bits_retain(software);
        let mut state = ModifierState::new();
        for code in hardware {
            state.note_hardware_transition(code, true);
        }

        if state.should_send_modifier(software, bit, true) {
            state.update_remote_mask(bit, true);
            prop_assert!(!state.should_send_modifier(software, bit, true));
            prop_assert!(state.remote().contains(bit));
        }
    }

    #[test]
    fn prop_pending_downs_are_sent_once(software in any::<u8>()) {
        let wanted = ModifierMask::from_bits_retain(software);
        let mut state = ModifierState::new();
        for bit in state.pending_downs(wanted) {
            state.update_remote_mask(bit, true);
        }
        prop_assert_eq!(state.remote(), wanted);
        prop_assert!(state.pending_downs(wanted).is_empty());
        prop_assert!(state.pending_ups(wanted).is_empty());
        prop_assert_eq!(state.pending_ups(ModifierMask::NONE).len(), wanted.iter_ordered().count());
    }
}

#[test]
fn test_toggle_survives_physical_release() {
    let (mut session, _output) = rfb_session();
    session
        .set_software_modifier(ModifierMask::SHIFT_LEFT, true)
        .unwrap();
    session
        .key_down(KeyIdentity::Code(KEYCODE_A), ModifierMask::NONE)
        .unwrap();
    assert!(session.modifiers().remote().contains(ModifierMask::SHIFT_LEFT));

    session
        .key_up(KeyIdentity::Code(KEYCODE_A), ModifierMask::NONE)
        .unwrap();
    assert!(session.modifiers().remote().is_empty());

    // Still latched: the next press asserts it again
    session
        .key_down(KeyIdentity::Code(KEYCODE_A), ModifierMask::NONE)
        .unwrap();
    assert!(session.modifiers().remote().contains(ModifierMask::SHIFT_LEFT));
}
