//! `Tapdesk` Core Library
//!
//! This crate provides the input and clipboard core shared by the `Tapdesk`
//! remote desktop viewers: keyboard and pointer translation into RFB, RDP
//! and SPICE events, modifier tracking, the RFB Extended Clipboard, input
//! settings, and the registry that native callbacks use to find their
//! session.

pub mod clipboard;
pub mod config;
pub mod encoder;
pub mod error;
pub mod input;
pub mod session;

pub use clipboard::{
    ClipboardDispatcher, ClipboardEvent, ClipboardEventProxy, ClipboardListener, ClipboardMessage,
    ClipboardMessageType, ExtendedClipboard, ServerMessageHandler,
};
pub use config::{ConfigManager, InputSettings};
pub use encoder::{
    InputEvent, NormalizedKeyEvent, PointerMode, ProtocolEncoder, RdpEncoder, RdpSession,
    RfbEncoder, SharedOutput, SpiceEncoder, SpiceSession,
};
pub use error::{
    ClipboardError, ClipboardResult, ConfigError, ConfigResult, EncodeError, EncodeResult,
    LayoutError, LayoutResult, Result, TapdeskError,
};
pub use input::{
    InputSession, KeyIdentity, KeyTranslator, KeyboardLayout, ModifierMask, ModifierState,
    NormalizedPointerEvent, PointerButton, PointerTranslator, RemoteKey, RemoteProtocol,
    ScrollDirection, ScrollPolicy,
};
pub use session::SessionRegistry;
