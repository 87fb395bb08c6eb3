//! Property tests for pointer translation

use proptest::prelude::*;
use tapdesk_core::input::{CoordinateTransform, ScrollDirection};
use tapdesk_core::{ModifierMask, PointerButton, PointerTranslator, ScrollPolicy};

use super::{rfb_session, written, RfbEvent};

fn arb_button() -> impl Strategy<Value = PointerButton> {
    prop_oneof![
        Just(PointerButton::Left),
        Just(PointerButton::Middle),
        Just(PointerButton::Right),
    ]
}

#[test]
fn test_second_button_releases_first() {
    let (mut session, output) = rfb_session();
    session
        .pointer_down(PointerButton::Left, 10.0, 10.0, ModifierMask::NONE)
        .unwrap();
    session
        .pointer_down(PointerButton::Right, 20.0, 20.0, ModifierMask::NONE)
        .unwrap();

    assert_eq!(
        written(&output),
        vec![
            RfbEvent::Pointer { buttons: 1, x: 10, y: 10 },
            RfbEvent::Pointer { buttons: 0, x: 20, y: 20 },
            RfbEvent::Pointer { buttons: 4, x: 20, y: 20 },
        ]
    );
}

#[test]
fn test_move_is_clamped_to_desktop() {
    let (mut session, output) = rfb_session();
    session
        .pointer_move(-5.0, 100_000.0, ModifierMask::NONE)
        .unwrap();
    assert_eq!(
        written(&output),
        vec![RfbEvent::Pointer { buttons: 0, x: 0, y: 767 }]
    );
}

#[test]
fn test_scroll_gesture_uses_policy() {
    let (session, output) = rfb_session();
    let mut session = session.with_scroll_policy(ScrollPolicy {
        distance_per_click: 10.0,
        max_repeat: 3,
    });
    session
        .scroll_gesture(ScrollDirection::Down, 5.0, 5.0, ModifierMask::NONE, 25.0)
        .unwrap();

    let clicks = written(&output)
        .into_iter()
        .filter(|e| matches!(e, RfbEvent::Pointer { buttons: 16, .. }))
        .count();
    assert_eq!(clicks, 2);
}

proptest! {
    #[test]
    fn prop_coordinates_stay_in_bounds(
        width in 1u32..4096,
        height in 1u32..4096,
        x in -1.0e6f64..1.0e6,
        y in -1.0e6f64..1.0e6,
    ) {
        let mut pointer = PointerTranslator::new(width, height);
        let event = pointer.move_to(x, y, ModifierMask::NONE);
        prop_assert!(u32::from(event.x) < width);
        prop_assert!(u32::from(event.y) < height);
    }

    #[test]
    fn prop_scaled_view_stays_in_bounds(
        view in (1u32..4000, 1u32..4000),
        desktop in (1u32..4000, 1u32..4000),
        x in -10_000.0f64..10_000.0,
        y in -10_000.0f64..10_000.0,
    ) {
        let transform = CoordinateTransform::new(view.0, view.1, desktop.0, desktop.1);
        let (dx, dy) = transform.transform_to_u16(x, y);
        prop_assert!(u32::from(dx) < desktop.0);
        prop_assert!(u32::from(dy) < desktop.1);
    }

    #[test]
    fn prop_at_most_one_button_held(
        presses in prop::collection::vec((arb_button(), 0.0f64..1024.0, 0.0f64..768.0), 1..10),
    ) {
        let mut pointer = PointerTranslator::new(1024, 768);
        let mut held: Option<PointerButton> = None;

        for (button, x, y) in presses {
            let events = pointer.down(button, x, y, ModifierMask::NONE);
            let press = events.last().unwrap();
            prop_assert!(press.down);
            prop_assert_eq!(press.button, button);
            prop_assert_eq!(press.buttons, button.mask());

            match held {
                Some(prev) if prev != button => {
                    prop_assert_eq!(events.len(), 2);
                    prop_assert_eq!(events[0].button, prev);
                    prop_assert!(!events[0].down);
                    prop_assert_eq!(events[0].buttons, 0);
                }
                _ => prop_assert_eq!(events.len(), 1),
            }
            held = Some(button);
            prop_assert_eq!(pointer.held_button(), held);
        }

        let release = pointer.release(0.0, 0.0, ModifierMask::NONE);
        prop_assert_eq!(release.buttons, 0);
        prop_assert!(pointer.held_button().is_none());
    }

    #[test]
    fn prop_repeat_count_bounded(
        distance in -1.0e5f64..1.0e5,
        per_click in 0.1f64..100.0,
        max_repeat in 1u32..50,
    ) {
        let policy = ScrollPolicy { distance_per_click: per_click, max_repeat };
        let repeat = policy.repeat_count(distance);
        prop_assert!(repeat >= 1);
        prop_assert!(repeat <= max_repeat);
    }
}
