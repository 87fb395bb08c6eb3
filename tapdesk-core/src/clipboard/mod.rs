//! RFB Extended Clipboard
//!
//! Capability-negotiated clipboard exchange layered on the RFB cut-text
//! messages:
//!
//! - [`message`]: wire framing, size limits and the reader
//! - [`compress`]: zlib payload encoding of clipboard text
//! - [`ExtendedClipboard`]: the negotiation and exchange state machine
//! - [`ClipboardDispatcher`]: routes server messages on the reader thread

mod compress;
mod dispatch;
pub mod message;
mod protocol;

pub use compress::{compress_clipboard_text, decompress_clipboard_text};
pub use dispatch::{ClipboardDispatcher, ServerMessageHandler};
pub use message::{ClipboardMessage, ClipboardMessageType, ServerCutText};
pub use protocol::{
    ClipboardEvent, ClipboardEventProxy, ClipboardListener, ClipboardSession, ExtendedClipboard,
};
