//! Protocol encoders
//!
//! A [`ProtocolEncoder`] serializes normalized key and pointer events into a
//! protocol's wire format or native session calls:
//!
//! - [`RfbEncoder`]: RFB `KeyEvent`/`PointerEvent` messages on a byte stream
//! - [`RdpEncoder`]: virtual-key, Unicode and pointer calls on an RDP session
//! - [`SpiceEncoder`]: scancode and mouse calls on a SPICE session
//!
//! Every encoder writes through a [`SharedOutput`], the per-session lock that
//! other writers (the clipboard handler on the reader thread) share. A batch
//! passed to [`ProtocolEncoder::send_events`] is transmitted under a single
//! acquisition of that lock.
//!
//! Encoders never retry: a failed write is returned to the caller, which owns
//! reconnection.

mod rdp;
mod rfb;
mod spice;

use std::fmt;
use std::sync::{Arc, LockResult, Mutex, MutexGuard};

use crate::error::{EncodeError, EncodeResult};
use crate::input::{ModifierMask, NormalizedPointerEvent, RemoteKey, RemoteProtocol};

pub use rdp::{
    pointer_flags, rdp_pointer_flags, RdpEncoder, RdpSession, DEFAULT_MODIFIER_DELAY,
};
pub use rfb::{
    RfbEncoder, CLIENT_MSG_KEY_EVENT, CLIENT_MSG_POINTER_EVENT, KEY_EVENT_LEN, POINTER_EVENT_LEN,
};
pub use spice::{spice_button, spice_buttons_state, PointerMode, SpiceEncoder, SpiceSession};

/// A key event in a protocol code space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedKeyEvent {
    /// The protocol key
    pub key: RemoteKey,
    /// Press (`true`) or release
    pub down: bool,
    /// Modifiers in effect for this event
    pub meta: ModifierMask,
}

impl NormalizedKeyEvent {
    /// Creates a key event
    #[must_use]
    pub const fn new(key: RemoteKey, down: bool, meta: ModifierMask) -> Self {
        Self { key, down, meta }
    }
}

/// One event of an atomic batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// A key press or release
    Key(NormalizedKeyEvent),
    /// A pointer move, press or release
    Pointer(NormalizedPointerEvent),
}

impl From<NormalizedKeyEvent> for InputEvent {
    fn from(event: NormalizedKeyEvent) -> Self {
        Self::Key(event)
    }
}

impl From<NormalizedPointerEvent> for InputEvent {
    fn from(event: NormalizedPointerEvent) -> Self {
        Self::Pointer(event)
    }
}

/// Serializes normalized input for one protocol
pub trait ProtocolEncoder: Send {
    /// The protocol this encoder speaks
    fn protocol(&self) -> RemoteProtocol;

    /// Transmits a single key event
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not in this protocol's code space or
    /// the transmission fails.
    fn send_key(&mut self, event: &NormalizedKeyEvent) -> EncodeResult<()> {
        self.send_events(&[InputEvent::Key(*event)])
    }

    /// Transmits a single pointer event
    ///
    /// # Errors
    ///
    /// Returns an error if the transmission fails.
    fn send_pointer(&mut self, event: &NormalizedPointerEvent) -> EncodeResult<()> {
        self.send_events(&[InputEvent::Pointer(*event)])
    }

    /// Transmits a batch of events without interleaving other writers
    ///
    /// # Errors
    ///
    /// Returns the first error; events after it are not sent.
    fn send_events(&mut self, events: &[InputEvent]) -> EncodeResult<()>;
}

impl<E: ProtocolEncoder + ?Sized> ProtocolEncoder for Box<E> {
    fn protocol(&self) -> RemoteProtocol {
        (**self).protocol()
    }

    fn send_events(&mut self, events: &[InputEvent]) -> EncodeResult<()> {
        (**self).send_events(events)
    }
}

/// A session output (byte stream or native session handle) behind the
/// per-session lock
///
/// Cloning shares the same lock.
pub struct SharedOutput<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> SharedOutput<T> {
    /// Wraps an output
    #[must_use]
    pub fn new(output: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(output)),
        }
    }

    /// Acquires the lock
    ///
    /// # Errors
    ///
    /// Fails if a previous holder panicked while writing.
    pub fn lock(&self) -> LockResult<MutexGuard<'_, T>> {
        self.inner.lock()
    }

    /// Runs `f` with exclusive access to the output
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::LockPoisoned`] if the lock is poisoned, or the
    /// error produced by `f`.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> EncodeResult<R>) -> EncodeResult<R> {
        let mut guard = self.inner.lock().map_err(|_| EncodeError::LockPoisoned)?;
        f(&mut guard)
    }
}

impl<T> Clone for SharedOutput<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for SharedOutput<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedOutput")
            .field("writers", &Arc::strong_count(&self.inner))
            .finish()
    }
}

pub(crate) fn unsupported_key(protocol: RemoteProtocol, key: RemoteKey) -> EncodeError {
    EncodeError::UnsupportedKey {
        protocol: protocol.as_str(),
        key: key.to_string(),
    }
}
