//! Extended Clipboard state machine
//!
//! ```text
//! Unnegotiated --(server CAPS)--> Negotiated
//! ```
//!
//! Once negotiated, a local change is announced with NOTIFY and handed over
//! with PROVIDE when the server sends REQUEST. A server NOTIFY is answered
//! with REQUEST, and the server's PROVIDE is delivered to the listener.
//! A handler built with `with_allowed(false)` never answers CAPS, so it
//! stays unnegotiated and silent.
//!
//! [`ExtendedClipboard`] is shared between the UI thread (announcements)
//! and the protocol reader thread (inbound messages). Replies are written
//! through the session's [`SharedOutput`] so they never interleave with
//! input events.

use std::io::{Read, Write};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};

use tracing::{debug, trace, warn};

use super::compress::{compress_clipboard_text, decompress_clipboard_text};
use super::message::{
    encode_caps, encode_notify, encode_provide, encode_request, read_server_cut_text,
    ClipboardMessage, ClipboardMessageType, ServerCutText,
};
use crate::encoder::SharedOutput;
use crate::error::{ClipboardError, ClipboardResult};

/// Receives clipboard contents and failures from the remote side
pub trait ClipboardListener: Send + Sync {
    /// Called with text copied on the remote side
    fn on_clipboard_received(&self, text: &str);

    /// Called when remote clipboard data could not be decoded
    fn on_clipboard_error(&self, message: &str, cause: &ClipboardError);
}

/// A clipboard notification forwarded by [`ClipboardEventProxy`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardEvent {
    /// Remote clipboard text
    Received(String),
    /// A decoding failure, as message and cause
    Error {
        /// What failed
        message: String,
        /// The underlying error
        cause: String,
    },
}

/// Listener forwarding events over a channel to a polling UI loop
#[derive(Debug, Clone)]
pub struct ClipboardEventProxy {
    sender: mpsc::Sender<ClipboardEvent>,
}

impl ClipboardEventProxy {
    /// Creates a proxy and the receiving end of its channel
    #[must_use]
    pub fn channel() -> (Self, mpsc::Receiver<ClipboardEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }

    fn forward(&self, event: ClipboardEvent) {
        if self.sender.send(event).is_err() {
            trace!("Clipboard event receiver dropped");
        }
    }
}

impl ClipboardListener for ClipboardEventProxy {
    fn on_clipboard_received(&self, text: &str) {
        self.forward(ClipboardEvent::Received(text.to_string()));
    }

    fn on_clipboard_error(&self, message: &str, cause: &ClipboardError) {
        self.forward(ClipboardEvent::Error {
            message: message.to_string(),
            cause: cause.to_string(),
        });
    }
}

/// Negotiation state and the text awaiting a server REQUEST
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardSession {
    enabled: bool,
    pending_outbound: Option<String>,
}

impl ClipboardSession {
    /// Whether the server announced Extended Clipboard support
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Text announced but not yet provided
    #[must_use]
    pub fn pending_outbound(&self) -> Option<&str> {
        self.pending_outbound.as_deref()
    }
}

/// Extended Clipboard handler of one RFB session
pub struct ExtendedClipboard<W> {
    output: SharedOutput<W>,
    listener: Arc<dyn ClipboardListener>,
    session: Mutex<ClipboardSession>,
    allowed: bool,
}

impl<W> std::fmt::Debug for ExtendedClipboard<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedClipboard")
            .field("output", &self.output)
            .field("session", &self.session)
            .field("allowed", &self.allowed)
            .finish_non_exhaustive()
    }
}

impl<W: Write> ExtendedClipboard<W> {
    /// Creates a handler writing to the session output
    #[must_use]
    pub fn new(output: SharedOutput<W>, listener: Arc<dyn ClipboardListener>) -> Self {
        Self {
            output,
            listener,
            session: Mutex::new(ClipboardSession::default()),
            allowed: true,
        }
    }

    /// Turns the clipboard exchange on or off for this session
    ///
    /// A disabled handler ignores server CAPS and legacy cut text, so
    /// nothing is announced, requested or delivered.
    #[must_use]
    pub fn with_allowed(mut self, allowed: bool) -> Self {
        self.allowed = allowed;
        self
    }

    fn session(&self) -> ClipboardResult<MutexGuard<'_, ClipboardSession>> {
        self.session.lock().map_err(|_| ClipboardError::LockPoisoned)
    }

    /// Returns a snapshot of the negotiation state
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardError::LockPoisoned`] if a thread panicked while
    /// holding the state.
    pub fn state(&self) -> ClipboardResult<ClipboardSession> {
        Ok(self.session()?.clone())
    }

    /// Whether the clipboard has been negotiated
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.session().is_ok_and(|session| session.enabled)
    }

    fn write(&self, bytes: &[u8]) -> ClipboardResult<()> {
        let mut stream = self
            .output
            .lock()
            .map_err(|_| ClipboardError::LockPoisoned)?;
        stream.write_all(bytes)?;
        stream.flush()?;
        Ok(())
    }

    /// Announces a local clipboard change
    ///
    /// Before negotiation, or for empty text, nothing is sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the NOTIFY cannot be written.
    pub fn announce_clipboard_change(&self, text: &str) -> ClipboardResult<()> {
        {
            let mut session = self.session()?;
            if !session.enabled {
                trace!("Clipboard not negotiated, dropping local change");
                return Ok(());
            }
            if text.is_empty() {
                return Ok(());
            }
            session.pending_outbound = Some(text.to_string());
        }
        debug!("Announcing {} bytes of clipboard text", text.len());
        self.write(&encode_notify())
    }

    /// Handles one inbound Extended Clipboard message
    ///
    /// Decoding failures go to the listener; only write failures are
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error if a reply cannot be written.
    pub fn handle_message(&self, message: &ClipboardMessage) -> ClipboardResult<()> {
        match message.kind {
            ClipboardMessageType::Caps => self.handle_caps(message),
            ClipboardMessageType::Notify => {
                if !self.is_enabled() || !message.has_utf8() {
                    trace!("Ignoring clipboard NOTIFY (flags {:#010x})", message.flags);
                    return Ok(());
                }
                self.write(&encode_request())
            }
            ClipboardMessageType::Request => self.handle_request(message),
            ClipboardMessageType::Provide => {
                self.handle_provide(message);
                Ok(())
            }
            ClipboardMessageType::Unknown => {
                trace!("Ignoring clipboard message (flags {:#010x})", message.flags);
                Ok(())
            }
        }
    }

    fn handle_caps(&self, message: &ClipboardMessage) -> ClipboardResult<()> {
        if !self.allowed {
            debug!("Clipboard disabled, ignoring server caps {:#010x}", message.flags);
            return Ok(());
        }
        let was_enabled = self.is_enabled();
        debug!(
            "Server clipboard caps {:#010x}{}",
            message.flags,
            if was_enabled { " (renegotiation)" } else { "" }
        );
        self.write(&encode_caps())?;
        self.session()?.enabled = true;
        Ok(())
    }

    fn handle_request(&self, message: &ClipboardMessage) -> ClipboardResult<()> {
        let pending = {
            let session = self.session()?;
            if !session.enabled || !message.has_utf8() {
                return Ok(());
            }
            session.pending_outbound.clone()
        };
        let Some(text) = pending else {
            trace!("Clipboard REQUEST with nothing pending");
            return Ok(());
        };

        let compressed = match compress_clipboard_text(&text) {
            Ok(compressed) => compressed,
            Err(e) => {
                warn!("Cannot provide clipboard text: {e}");
                self.listener
                    .on_clipboard_error("Failed to encode clipboard text", &e);
                return Ok(());
            }
        };
        self.write(&encode_provide(&compressed))?;

        // A newer announcement may have replaced the text meanwhile
        let mut session = self.session()?;
        if session.pending_outbound.as_deref() == Some(text.as_str()) {
            session.pending_outbound = None;
        }
        Ok(())
    }

    fn handle_provide(&self, message: &ClipboardMessage) {
        if !self.is_enabled() || !message.has_utf8() || message.payload.is_empty() {
            trace!("Ignoring clipboard PROVIDE (flags {:#010x})", message.flags);
            return;
        }
        match decompress_clipboard_text(&message.payload) {
            Ok(Some(text)) => {
                debug!("Received {} bytes of clipboard text", text.len());
                self.listener.on_clipboard_received(&text);
            }
            Ok(None) => debug!("Clipboard PROVIDE carried no text"),
            Err(e) => {
                warn!("Failed to decode clipboard data: {e}");
                self.listener
                    .on_clipboard_error("Failed to decode clipboard data", &e);
            }
        }
    }

    /// Reads and handles the rest of a server cut-text message
    ///
    /// # Errors
    ///
    /// Returns an error if the stream fails or a reply cannot be written.
    pub fn read_server_cut_text<R: Read + ?Sized>(&self, reader: &mut R) -> ClipboardResult<()> {
        match read_server_cut_text(reader)? {
            ServerCutText::Extended(message) => self.handle_message(&message),
            ServerCutText::Legacy(_) if !self.allowed => {
                trace!("Clipboard disabled, dropping legacy cut text");
                Ok(())
            }
            ServerCutText::Legacy(Some(text)) if !text.is_empty() => {
                debug!("Received {} bytes of legacy cut text", text.len());
                self.listener.on_clipboard_received(&text);
                Ok(())
            }
            ServerCutText::Legacy(_) => Ok(()),
        }
    }
}
