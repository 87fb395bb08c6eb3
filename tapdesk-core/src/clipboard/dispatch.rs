//! RFB server message dispatch
//!
//! The protocol reader thread owns the inbound stream. For each server
//! message it reads the type byte, routes cut text to the clipboard handler
//! and everything else to the session's [`ServerMessageHandler`], which must
//! consume the message body.

use std::io::{self, Read, Write};
use std::sync::Arc;

use tracing::{debug, trace};

use super::message::SERVER_MSG_SERVER_CUT_TEXT;
use super::protocol::ExtendedClipboard;
use crate::error::{ClipboardError, ClipboardResult};

/// Handles server messages other than cut text
pub trait ServerMessageHandler {
    /// Consumes the body of a message whose type byte was already read
    ///
    /// # Errors
    ///
    /// Returns an error if the stream fails or the type is not understood;
    /// either ends the reader loop.
    fn handle_message(&mut self, message_type: u8, reader: &mut dyn Read) -> io::Result<()>;
}

/// Routes inbound server messages
#[derive(Debug)]
pub struct ClipboardDispatcher<W, H> {
    clipboard: Arc<ExtendedClipboard<W>>,
    handler: H,
}

impl<W: Write, H: ServerMessageHandler> ClipboardDispatcher<W, H> {
    /// Creates a dispatcher
    #[must_use]
    pub const fn new(clipboard: Arc<ExtendedClipboard<W>>, handler: H) -> Self {
        Self { clipboard, handler }
    }

    /// Returns the clipboard handler
    #[must_use]
    pub const fn clipboard(&self) -> &Arc<ExtendedClipboard<W>> {
        &self.clipboard
    }

    /// Reads and routes one server message
    ///
    /// # Errors
    ///
    /// Returns an error if the stream fails, the handler rejects the
    /// message, or a clipboard reply cannot be written.
    pub fn dispatch<R: Read>(&mut self, reader: &mut R) -> ClipboardResult<()> {
        let mut message_type = [0u8; 1];
        reader.read_exact(&mut message_type)?;
        let message_type = message_type[0];

        if message_type == SERVER_MSG_SERVER_CUT_TEXT {
            trace!("Dispatching server cut text");
            self.clipboard.read_server_cut_text(reader)
        } else {
            self.handler
                .handle_message(message_type, reader)
                .map_err(ClipboardError::from)
        }
    }

    /// Dispatches messages until the stream fails
    ///
    /// Closing the session unblocks the read with an error, which is
    /// returned here.
    pub fn run_reader_loop<R: Read>(&mut self, reader: &mut R) -> ClipboardError {
        loop {
            if let Err(e) = self.dispatch(reader) {
                debug!("Protocol reader stopped: {e}");
                return e;
            }
        }
    }
}
