//! Per-session input orchestration
//!
//! [`InputSession`] is what the UI layer calls for every key, pointer and
//! toggle event. It translates the event, decides which modifier transitions
//! must accompany it, and hands the whole group to the encoder as one batch:
//!
//! ```text
//! [modifier downs] [key or pointer events] [modifier ups]
//! ```
//!
//! Modifiers wanted by a press (on-screen toggles plus whatever the key
//! mapping requires) are asserted before it and released once the key or
//! button goes up. Physical modifier keys are forwarded as they happen and
//! are never released on their behalf.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use super::keycodes::{KeyIdentity, KEYCODE_FORWARD_DEL};
use super::keysym::XK_DELETE;
use super::key::{KeyTranslator, RemoteKey};
use super::modifier::{ModifierMask, ModifierState};
use super::pointer::{PointerButton, PointerTranslator, ScrollDirection, ScrollPolicy};
use super::vk::VK_DELETE;
use super::RemoteProtocol;
use crate::encoder::{InputEvent, NormalizedKeyEvent, ProtocolEncoder};
use crate::error::EncodeResult;

/// SPICE scancode of Delete (E0 53)
const SCANCODE_DELETE: u32 = 0x153;

/// Events to transmit together, with the modifier transitions they carry
#[derive(Debug, Default)]
struct Batch {
    events: Vec<InputEvent>,
    transitions: Vec<(ModifierMask, bool)>,
}

impl Batch {
    fn key(&mut self, key: RemoteKey, down: bool, meta: ModifierMask) {
        self.events
            .push(InputEvent::Key(NormalizedKeyEvent::new(key, down, meta)));
    }

    fn modifier(&mut self, keys: &KeyTranslator, bit: ModifierMask, down: bool, meta: ModifierMask) {
        if let Some(key) = keys.modifier_key(bit) {
            self.key(key, down, meta);
            self.transitions.push((bit, down));
        }
    }
}

/// Input pipeline of one remote session
pub struct InputSession {
    modifiers: ModifierState,
    keys: KeyTranslator,
    pointer: PointerTranslator,
    scroll: ScrollPolicy,
    encoder: Box<dyn ProtocolEncoder>,
    /// Modifiers asserted for the key or button currently held
    held: ModifierMask,
    /// Remote keys sent down, by the identity that produced them
    pressed: HashMap<KeyIdentity, RemoteKey>,
}

impl std::fmt::Debug for InputSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSession")
            .field("protocol", &self.encoder.protocol())
            .field("modifiers", &self.modifiers)
            .field("pointer", &self.pointer)
            .field("held", &self.held)
            .finish_non_exhaustive()
    }
}

impl InputSession {
    /// Creates an input session
    #[must_use]
    pub fn new(
        keys: KeyTranslator,
        pointer: PointerTranslator,
        encoder: Box<dyn ProtocolEncoder>,
    ) -> Self {
        if keys.protocol() != encoder.protocol() {
            warn!(
                "Key translator targets {} but encoder speaks {}",
                keys.protocol(),
                encoder.protocol()
            );
        }
        Self {
            modifiers: ModifierState::new(),
            keys,
            pointer,
            scroll: ScrollPolicy::default(),
            encoder,
            held: ModifierMask::NONE,
            pressed: HashMap::new(),
        }
    }

    /// Replaces the scroll-speed policy
    #[must_use]
    pub fn with_scroll_policy(mut self, scroll: ScrollPolicy) -> Self {
        self.scroll = scroll;
        self
    }

    /// Returns the session protocol
    #[must_use]
    pub fn protocol(&self) -> RemoteProtocol {
        self.encoder.protocol()
    }

    /// Returns the modifier bookkeeping
    #[must_use]
    pub const fn modifiers(&self) -> &ModifierState {
        &self.modifiers
    }

    /// Returns the pointer state
    #[must_use]
    pub const fn pointer(&self) -> &PointerTranslator {
        &self.pointer
    }

    fn transmit(&mut self, batch: Batch) -> EncodeResult<()> {
        if batch.events.is_empty() {
            return Ok(());
        }
        self.encoder.send_events(&batch.events)?;
        for (bit, down) in batch.transitions {
            self.modifiers.update_remote_mask(bit, down);
        }
        Ok(())
    }

    /// Modifier state as it will be once `batch` was transmitted
    fn projected(&self, batch: &Batch) -> ModifierState {
        let mut state = self.modifiers;
        for (bit, down) in &batch.transitions {
            state.update_remote_mask(*bit, *down);
        }
        state
    }

    fn assert_modifiers(&self, batch: &mut Batch, wanted: ModifierMask) {
        for bit in self.modifiers.pending_downs(wanted) {
            batch.modifier(&self.keys, bit, true, wanted);
        }
    }

    /// Releases every modifier not held by a physical key
    fn release_modifiers(&self, batch: &mut Batch) {
        for bit in self.modifiers.pending_ups(ModifierMask::NONE) {
            batch.modifier(&self.keys, bit, false, ModifierMask::NONE);
        }
    }

    /// Handles a key press
    ///
    /// Keys without a remote mapping are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails; the modifier state then still
    /// reflects what the remote side was told before the failure.
    pub fn key_down(&mut self, key: KeyIdentity, meta: ModifierMask) -> EncodeResult<()> {
        if let KeyIdentity::Code(code) = key {
            if let Some(bit) = self.modifiers.note_hardware_transition(code, true) {
                let mut batch = Batch::default();
                if !self.modifiers.remote().contains(bit) {
                    batch.modifier(&self.keys, bit, true, self.modifiers.hardware());
                }
                return self.transmit(batch);
            }
        }

        // Ctrl and Super travel as modifier keys and never pick the character
        let char_meta = meta - (ModifierMask::CTRL | ModifierMask::SUPER);
        let translated = self.keys.translate(key, char_meta);
        let Some((last, leading)) = translated.split_last() else {
            return Ok(());
        };

        // Each entry of a sequence (dead keys first) gets only the modifiers
        // it needs; bits asserted for an earlier entry are released first
        let software = self.modifiers.software();
        let mut batch = Batch::default();
        let mut asserted = ModifierMask::NONE;
        for (index, entry) in translated.iter().enumerate() {
            let wanted = software | entry.modifiers;
            for bit in self.projected(&batch).pending_ups(wanted) {
                if asserted.contains(bit) {
                    batch.modifier(&self.keys, bit, false, wanted);
                }
            }
            for bit in self.projected(&batch).pending_downs(wanted) {
                batch.modifier(&self.keys, bit, true, wanted);
                asserted |= bit;
            }
            batch.key(entry.key, true, wanted);
            if index < leading.len() {
                batch.key(entry.key, false, wanted);
            }
        }
        let wanted = software | last.modifiers;
        self.transmit(batch)?;
        self.held = wanted;
        self.pressed.insert(key, last.key);
        trace!("Key down {key} -> {}", last.key);
        Ok(())
    }

    /// Handles a key release
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails.
    pub fn key_up(&mut self, key: KeyIdentity, meta: ModifierMask) -> EncodeResult<()> {
        if let KeyIdentity::Code(code) = key {
            if let Some(bit) = self.modifiers.note_hardware_transition(code, false) {
                let mut batch = Batch::default();
                if self.modifiers.should_send_modifier(self.held, bit, false) {
                    batch.modifier(&self.keys, bit, false, self.modifiers.hardware());
                }
                return self.transmit(batch);
            }
        }

        let remote = match self.pressed.remove(&key) {
            Some(remote) => remote,
            None => {
                let char_meta = meta - (ModifierMask::CTRL | ModifierMask::SUPER);
                match self.keys.translate(key, char_meta).last() {
                    Some(translated) => translated.key,
                    None => return Ok(()),
                }
            }
        };

        let mut batch = Batch::default();
        batch.key(remote, false, self.held);
        if self.pointer.held_button().is_none() {
            self.release_modifiers(&mut batch);
        }
        self.transmit(batch)?;
        self.held = ModifierMask::NONE;
        Ok(())
    }

    /// Types `text` as a sequence of character presses and releases
    ///
    /// # Errors
    ///
    /// Stops at the first encoder failure.
    pub fn send_text(&mut self, text: &str) -> EncodeResult<()> {
        for ch in text.chars() {
            let key = KeyIdentity::Unicode(ch);
            self.key_down(key, ModifierMask::NONE)?;
            self.key_up(key, ModifierMask::NONE)?;
        }
        Ok(())
    }

    /// Latches or unlatches an on-screen modifier toggle
    ///
    /// Latching sends nothing; the modifier accompanies the next press.
    /// Unlatching releases it on the remote side unless a physical key or
    /// the current key mapping still holds it.
    ///
    /// # Errors
    ///
    /// Returns an error if the release cannot be transmitted.
    pub fn set_software_modifier(&mut self, bit: ModifierMask, on: bool) -> EncodeResult<()> {
        debug!("Software modifier {bit} {}", if on { "on" } else { "off" });
        self.modifiers.set_software(bit, on);
        if on {
            return Ok(());
        }

        self.held = self.held - bit;
        let wanted = self.held | self.modifiers.software();
        let mut batch = Batch::default();
        for released in self.modifiers.pending_ups(wanted) {
            if bit.contains(released) {
                batch.modifier(&self.keys, released, false, wanted);
            }
        }
        self.transmit(batch)
    }

    /// Presses a pointer button at view coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails.
    pub fn pointer_down(
        &mut self,
        button: PointerButton,
        x: f64,
        y: f64,
        meta: ModifierMask,
    ) -> EncodeResult<()> {
        let wanted = self.modifiers.software();
        let mut batch = Batch::default();
        self.assert_modifiers(&mut batch, wanted);
        for event in self.pointer.down(button, x, y, meta) {
            batch.events.push(InputEvent::Pointer(event));
        }
        self.transmit(batch)?;
        self.held |= wanted;
        Ok(())
    }

    /// Moves the pointer, dragging the held button if any
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails.
    pub fn pointer_move(&mut self, x: f64, y: f64, meta: ModifierMask) -> EncodeResult<()> {
        let event = self.pointer.move_to(x, y, meta);
        self.encoder.send_pointer(&event)
    }

    /// Releases the held pointer button
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails.
    pub fn pointer_release(&mut self, x: f64, y: f64, meta: ModifierMask) -> EncodeResult<()> {
        let event = self.pointer.release(x, y, meta);
        let mut batch = Batch::default();
        batch.events.push(InputEvent::Pointer(event));
        self.release_modifiers(&mut batch);
        self.transmit(batch)?;
        self.held = ModifierMask::NONE;
        Ok(())
    }

    /// Sends `repeat` wheel clicks at view coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails.
    pub fn scroll(
        &mut self,
        direction: ScrollDirection,
        x: f64,
        y: f64,
        meta: ModifierMask,
        repeat: u32,
    ) -> EncodeResult<()> {
        let dragging = self.pointer.held_button().is_some();
        let wanted = self.modifiers.software();
        let mut batch = Batch::default();
        self.assert_modifiers(&mut batch, wanted);
        for event in self.pointer.scroll(direction, x, y, meta, repeat) {
            batch.events.push(InputEvent::Pointer(event));
        }
        if !dragging {
            self.release_modifiers(&mut batch);
        }
        self.transmit(batch)
    }

    /// Sends wheel clicks for an accumulated scroll gesture distance
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails.
    pub fn scroll_gesture(
        &mut self,
        direction: ScrollDirection,
        x: f64,
        y: f64,
        meta: ModifierMask,
        distance: f64,
    ) -> EncodeResult<()> {
        let repeat = self.scroll.repeat_count(distance);
        self.scroll(direction, x, y, meta, repeat)
    }

    /// Sends Ctrl+Alt+Del as one batch
    ///
    /// Ctrl or Alt already down on the remote side stay down afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails.
    pub fn send_ctrl_alt_del(&mut self) -> EncodeResult<()> {
        let delete = match self.keys.protocol() {
            RemoteProtocol::Rfb => RemoteKey::Keysym(XK_DELETE),
            RemoteProtocol::Rdp => RemoteKey::VirtualKey(VK_DELETE),
            RemoteProtocol::Spice => self
                .keys
                .translate(KeyIdentity::Code(KEYCODE_FORWARD_DEL), ModifierMask::NONE)
                .first()
                .map_or(RemoteKey::Scancode(SCANCODE_DELETE), |t| t.key),
        };

        let wanted = ModifierMask::CTRL_LEFT | ModifierMask::ALT_LEFT;
        let already = self.modifiers.remote() & wanted;
        let mut batch = Batch::default();
        for bit in [ModifierMask::CTRL_LEFT, ModifierMask::ALT_LEFT] {
            if !already.contains(bit) {
                batch.modifier(&self.keys, bit, true, wanted);
            }
        }
        batch.key(delete, true, wanted);
        batch.key(delete, false, wanted);
        for bit in [ModifierMask::ALT_LEFT, ModifierMask::CTRL_LEFT] {
            if !already.contains(bit) {
                batch.modifier(&self.keys, bit, false, wanted - bit);
            }
        }
        debug!("Sending Ctrl+Alt+Del over {}", self.keys.protocol());
        self.transmit(batch)
    }

    /// Sets the size of the view the remote desktop is shown in
    pub fn set_view_size(&mut self, width: u32, height: u32) {
        self.pointer.set_view_size(width, height);
    }

    /// Updates the desktop bounds after a remote resolution change
    pub fn resize_desktop(&mut self, width: u32, height: u32) {
        debug!("Remote desktop resized to {width}x{height}");
        self.pointer.resize_desktop(width, height);
    }

    /// Forgets modifier and key state after the connection was re-established
    pub fn reset(&mut self) {
        self.modifiers.reset();
        self.held = ModifierMask::NONE;
        self.pressed.clear();
    }
}
