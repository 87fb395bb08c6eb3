//! Property-based tests for the Tapdesk core library

mod clipboard_tests;
mod modifier_tests;
mod pointer_tests;

use tapdesk_core::encoder::{CLIENT_MSG_KEY_EVENT, CLIENT_MSG_POINTER_EVENT};
use tapdesk_core::input::{KeyTranslator, PointerTranslator, UsCharacterMap};
use tapdesk_core::{InputSession, RfbEncoder, SharedOutput};
use std::sync::Arc;

/// An RFB client message decoded from the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfbEvent {
    Key { keysym: u32, down: bool },
    Pointer { buttons: u8, x: u16, y: u16 },
}

/// Decodes the key and pointer messages written by `RfbEncoder`
pub fn decode_rfb(bytes: &[u8]) -> Vec<RfbEvent> {
    let mut events = Vec::new();
    let mut rest = bytes;
    while let Some(&kind) = rest.first() {
        match kind {
            CLIENT_MSG_KEY_EVENT => {
                events.push(RfbEvent::Key {
                    keysym: u32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]),
                    down: rest[1] == 1,
                });
                rest = &rest[8..];
            }
            CLIENT_MSG_POINTER_EVENT => {
                events.push(RfbEvent::Pointer {
                    buttons: rest[1],
                    x: u16::from_be_bytes([rest[2], rest[3]]),
                    y: u16::from_be_bytes([rest[4], rest[5]]),
                });
                rest = &rest[6..];
            }
            other => panic!("unexpected RFB message type {other}"),
        }
    }
    events
}

/// An RFB input session on a 1024x768 desktop writing to a shared buffer
pub fn rfb_session() -> (InputSession, SharedOutput<Vec<u8>>) {
    let output = SharedOutput::new(Vec::new());
    let encoder = RfbEncoder::new(output.clone());
    let session = InputSession::new(
        KeyTranslator::rfb(Arc::new(UsCharacterMap)),
        PointerTranslator::new(1024, 768),
        Box::new(encoder),
    );
    (session, output)
}

/// Everything written so far, decoded
pub fn written(output: &SharedOutput<Vec<u8>>) -> Vec<RfbEvent> {
    decode_rfb(&output.lock().unwrap())
}
