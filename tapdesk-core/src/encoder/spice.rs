//! SPICE input through a native session handle
//!
//! Keys are PC/AT scancodes. The pointer goes through separate position and
//! button calls; in relative mode the position becomes a motion delta from
//! the last transmitted position, as the guest drives its own cursor.

use std::io;

use tracing::trace;

use super::{unsupported_key, InputEvent, NormalizedKeyEvent, ProtocolEncoder, SharedOutput};
use crate::error::EncodeResult;
use crate::input::{NormalizedPointerEvent, PointerButton, RemoteKey, RemoteProtocol};

/// SPICE button state bits (left, middle, right)
const BUTTONS_STATE_MASK: u8 = 0x07;

/// How pointer positions are transmitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PointerMode {
    /// Absolute positions in desktop coordinates
    #[default]
    Absolute,
    /// Motion deltas from the last position
    Relative,
}

/// Native SPICE session operations the encoder drives
pub trait SpiceSession: Send {
    /// Sends a scancode press or release
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs channel failed.
    fn key_event(&mut self, scancode: u32, down: bool) -> io::Result<()>;

    /// Moves the cursor to an absolute position
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs channel failed.
    fn mouse_position(&mut self, x: u16, y: u16, buttons_state: u32) -> io::Result<()>;

    /// Moves the cursor by a delta
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs channel failed.
    fn mouse_motion(&mut self, dx: i32, dy: i32, buttons_state: u32) -> io::Result<()>;

    /// Presses a button; `buttons_state` includes it
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs channel failed.
    fn button_press(&mut self, button: u32, buttons_state: u32) -> io::Result<()>;

    /// Releases a button; `buttons_state` excludes it
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs channel failed.
    fn button_release(&mut self, button: u32, buttons_state: u32) -> io::Result<()>;
}

/// SPICE button id for a pointer button
///
/// Horizontal wheel buttons have no SPICE equivalent.
#[must_use]
pub const fn spice_button(button: PointerButton) -> Option<u32> {
    match button {
        PointerButton::Left => Some(1),
        PointerButton::Middle => Some(2),
        PointerButton::Right => Some(3),
        PointerButton::ScrollUp => Some(4),
        PointerButton::ScrollDown => Some(5),
        PointerButton::Move | PointerButton::ScrollLeft | PointerButton::ScrollRight => None,
    }
}

/// SPICE button state for an RFB-style held mask
///
/// The left, middle and right bits coincide; wheel bits are dropped.
#[must_use]
pub const fn spice_buttons_state(buttons: u8) -> u32 {
    (buttons & BUTTONS_STATE_MASK) as u32
}

/// Encoder driving a SPICE session handle
#[derive(Debug)]
pub struct SpiceEncoder<S> {
    session: SharedOutput<S>,
    mode: PointerMode,
    last_position: Option<(u16, u16)>,
}

impl<S: SpiceSession> SpiceEncoder<S> {
    /// Creates an encoder sending absolute positions
    #[must_use]
    pub const fn new(session: SharedOutput<S>) -> Self {
        Self {
            session,
            mode: PointerMode::Absolute,
            last_position: None,
        }
    }

    /// Selects absolute or relative pointer transmission
    #[must_use]
    pub const fn with_mode(mut self, mode: PointerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the pointer mode
    #[must_use]
    pub const fn mode(&self) -> PointerMode {
        self.mode
    }

    /// Switches pointer mode, e.g. when the guest agent connects
    pub fn set_mode(&mut self, mode: PointerMode) {
        self.mode = mode;
    }
}

/// Sends the position part of a pointer event, tracking the last position
fn send_position(
    session: &mut impl SpiceSession,
    mode: PointerMode,
    last_position: &mut Option<(u16, u16)>,
    event: &NormalizedPointerEvent,
    buttons_state: u32,
) -> io::Result<()> {
    let position = (event.x, event.y);
    let previous = last_position.replace(position);
    match mode {
        PointerMode::Absolute => {
            if event.button == PointerButton::Move || previous != Some(position) {
                session.mouse_position(event.x, event.y, buttons_state)?;
            }
        }
        PointerMode::Relative => {
            // The first sample only establishes the origin
            if let Some((last_x, last_y)) = previous {
                let dx = i32::from(event.x) - i32::from(last_x);
                let dy = i32::from(event.y) - i32::from(last_y);
                if dx != 0 || dy != 0 {
                    session.mouse_motion(dx, dy, buttons_state)?;
                }
            }
        }
    }
    Ok(())
}

fn send_key(session: &mut impl SpiceSession, event: &NormalizedKeyEvent) -> EncodeResult<()> {
    let RemoteKey::Scancode(scancode) = event.key else {
        return Err(unsupported_key(RemoteProtocol::Spice, event.key));
    };
    trace!("SPICE key event: scancode={scancode:#x}, pressed={}", event.down);
    session.key_event(scancode, event.down)?;
    Ok(())
}

fn send_pointer(
    session: &mut impl SpiceSession,
    mode: PointerMode,
    last_position: &mut Option<(u16, u16)>,
    event: &NormalizedPointerEvent,
) -> EncodeResult<()> {
    let after = spice_buttons_state(event.buttons);
    let mask = spice_buttons_state(event.button.mask());
    // Position updates carry the state before this event's transition
    let before = if event.down { after & !mask } else { after | mask };

    trace!(
        "SPICE pointer event: x={}, y={}, button={:?}, down={}",
        event.x,
        event.y,
        event.button,
        event.down
    );
    send_position(session, mode, last_position, event, before)?;

    if event.button == PointerButton::Move {
        return Ok(());
    }
    let Some(button) = spice_button(event.button) else {
        trace!("SPICE has no button for {:?}, dropping", event.button);
        return Ok(());
    };
    if event.down {
        session.button_press(button, after)?;
    } else {
        session.button_release(button, after)?;
    }
    Ok(())
}

impl<S: SpiceSession> ProtocolEncoder for SpiceEncoder<S> {
    fn protocol(&self) -> RemoteProtocol {
        RemoteProtocol::Spice
    }

    fn send_events(&mut self, events: &[InputEvent]) -> EncodeResult<()> {
        for event in events {
            if let InputEvent::Key(key) = event {
                if !matches!(key.key, RemoteKey::Scancode(_)) {
                    return Err(unsupported_key(RemoteProtocol::Spice, key.key));
                }
            }
        }

        let mode = self.mode;
        let last_position = &mut self.last_position;
        self.session.with(|session| {
            for event in events {
                match event {
                    InputEvent::Key(key) => send_key(session, key)?,
                    InputEvent::Pointer(pointer) => {
                        send_pointer(session, mode, last_position, pointer)?;
                    }
                }
            }
            Ok(())
        })
    }
}
