//! RDP input through a native session handle
//!
//! Keys travel as virtual-key codes with the extended flag, or as Unicode
//! events for characters without a virtual key. The remote key-state machine
//! needs a short pause between a modifier and the key it modifies, so a
//! batch sleeps for the configured delay whenever a modifier press or release
//! is followed by a non-modifier key.

use std::io;
use std::thread;
use std::time::Duration;

use tracing::trace;

use super::{unsupported_key, InputEvent, NormalizedKeyEvent, ProtocolEncoder, SharedOutput};
use crate::error::EncodeResult;
use crate::input::vk::is_modifier_virtual_key;
use crate::input::{NormalizedPointerEvent, PointerButton, RemoteKey, RemoteProtocol, VirtualKey};

/// Default pause between a modifier and the primary key
pub const DEFAULT_MODIFIER_DELAY: Duration = Duration::from_millis(20);

/// RDP pointer event flags (`TS_POINTER_EVENT`)
pub mod pointer_flags {
    /// Horizontal wheel rotation
    pub const HWHEEL: u16 = 0x0400;
    /// Vertical wheel rotation
    pub const WHEEL: u16 = 0x0200;
    /// Wheel rotation is negative
    pub const WHEEL_NEGATIVE: u16 = 0x0100;
    /// Mask of the wheel rotation value
    pub const WHEEL_ROTATION_MASK: u16 = 0x01FF;
    /// Pointer moved
    pub const MOVE: u16 = 0x0800;
    /// Button pressed (absent: released)
    pub const DOWN: u16 = 0x8000;
    /// Left button
    pub const BUTTON1: u16 = 0x1000;
    /// Right button
    pub const BUTTON2: u16 = 0x2000;
    /// Middle button
    pub const BUTTON3: u16 = 0x4000;
    /// One wheel click (120 units)
    pub const WHEEL_CLICK: u16 = 0x0078;
    /// One negative wheel click, two's complement in the rotation field
    pub const WHEEL_CLICK_NEGATIVE: u16 = WHEEL_NEGATIVE | 0x0088;
}

/// Native RDP session operations the encoder drives
pub trait RdpSession: Send {
    /// Sends a virtual-key press or release
    ///
    /// # Errors
    ///
    /// Returns an error if the session connection failed.
    fn send_key_event(&mut self, vk: VirtualKey, down: bool) -> io::Result<()>;

    /// Sends a Unicode character press or release
    ///
    /// # Errors
    ///
    /// Returns an error if the session connection failed.
    fn send_unicode_event(&mut self, ch: char, down: bool) -> io::Result<()>;

    /// Sends a pointer event with `TS_POINTER_EVENT` flags
    ///
    /// # Errors
    ///
    /// Returns an error if the session connection failed.
    fn send_pointer_event(&mut self, x: u16, y: u16, flags: u16) -> io::Result<()>;
}

/// Maps a pointer event to RDP flags
///
/// Returns `None` for wheel releases, which RDP does not transmit.
#[must_use]
pub const fn rdp_pointer_flags(event: &NormalizedPointerEvent) -> Option<u16> {
    use pointer_flags::*;

    let down = if event.down { DOWN } else { 0 };
    let flags = match event.button {
        PointerButton::Move => MOVE,
        PointerButton::Left => BUTTON1 | down,
        PointerButton::Right => BUTTON2 | down,
        PointerButton::Middle => BUTTON3 | down,
        _ if !event.down => return None,
        PointerButton::ScrollUp => WHEEL | WHEEL_CLICK,
        PointerButton::ScrollDown => WHEEL | WHEEL_CLICK_NEGATIVE,
        PointerButton::ScrollRight => HWHEEL | WHEEL_CLICK,
        PointerButton::ScrollLeft => HWHEEL | WHEEL_CLICK_NEGATIVE,
    };
    Some(flags)
}

/// Encoder driving an RDP session handle
#[derive(Debug)]
pub struct RdpEncoder<S> {
    session: SharedOutput<S>,
    modifier_delay: Duration,
}

impl<S: RdpSession> RdpEncoder<S> {
    /// Creates an encoder with the default modifier delay
    #[must_use]
    pub const fn new(session: SharedOutput<S>) -> Self {
        Self {
            session,
            modifier_delay: DEFAULT_MODIFIER_DELAY,
        }
    }

    /// Sets the pause between a modifier and the primary key
    #[must_use]
    pub const fn with_modifier_delay(mut self, delay: Duration) -> Self {
        self.modifier_delay = delay;
        self
    }

    /// Returns the configured modifier delay
    #[must_use]
    pub const fn modifier_delay(&self) -> Duration {
        self.modifier_delay
    }
}

fn is_modifier(event: &NormalizedKeyEvent) -> bool {
    matches!(event.key, RemoteKey::VirtualKey(vk) if is_modifier_virtual_key(vk))
}

fn send_key(session: &mut impl RdpSession, event: &NormalizedKeyEvent) -> EncodeResult<()> {
    trace!("RDP key event: {} down={}", event.key, event.down);
    match event.key {
        RemoteKey::VirtualKey(vk) => session.send_key_event(vk, event.down)?,
        RemoteKey::Unicode(ch) => session.send_unicode_event(ch, event.down)?,
        other => return Err(unsupported_key(RemoteProtocol::Rdp, other)),
    }
    Ok(())
}

impl<S: RdpSession> ProtocolEncoder for RdpEncoder<S> {
    fn protocol(&self) -> RemoteProtocol {
        RemoteProtocol::Rdp
    }

    fn send_events(&mut self, events: &[InputEvent]) -> EncodeResult<()> {
        // Reject foreign keys before anything reaches the session
        for event in events {
            if let InputEvent::Key(key) = event {
                if !matches!(key.key, RemoteKey::VirtualKey(_) | RemoteKey::Unicode(_)) {
                    return Err(unsupported_key(RemoteProtocol::Rdp, key.key));
                }
            }
        }

        let delay = self.modifier_delay;
        self.session.with(|session| {
            let mut after_modifier = false;
            for event in events {
                match event {
                    InputEvent::Key(key) => {
                        let modifier = is_modifier(key);
                        if after_modifier && !modifier && !delay.is_zero() {
                            thread::sleep(delay);
                        }
                        send_key(session, key)?;
                        after_modifier = modifier;
                    }
                    InputEvent::Pointer(pointer) => {
                        after_modifier = false;
                        let Some(flags) = rdp_pointer_flags(pointer) else {
                            continue;
                        };
                        trace!(
                            "RDP pointer event: x={}, y={}, flags={flags:#06x}",
                            pointer.x,
                            pointer.y
                        );
                        session.send_pointer_event(pointer.x, pointer.y, flags)?;
                    }
                }
            }
            Ok(())
        })
    }
}
