//! RFB input messages
//!
//! ```text
//! KeyEvent:     u8 type=4 | u8 down | u16 padding | u32 keysym
//! PointerEvent: u8 type=5 | u8 button-mask | u16 x | u16 y
//! ```
//!
//! All fields are big-endian. A batch is serialized into one buffer and
//! written with a single `write_all` under the output lock.

use std::io::Write;

use bytes::{BufMut, BytesMut};
use tracing::trace;

use super::{unsupported_key, InputEvent, NormalizedKeyEvent, ProtocolEncoder, SharedOutput};
use crate::error::EncodeResult;
use crate::input::{NormalizedPointerEvent, RemoteKey, RemoteProtocol};

/// Message type: client key event
pub const CLIENT_MSG_KEY_EVENT: u8 = 4;
/// Message type: client pointer event
pub const CLIENT_MSG_POINTER_EVENT: u8 = 5;
/// Encoded size of a key event
pub const KEY_EVENT_LEN: usize = 8;
/// Encoded size of a pointer event
pub const POINTER_EVENT_LEN: usize = 6;

/// Encoder writing RFB messages to a shared byte stream
#[derive(Debug)]
pub struct RfbEncoder<W> {
    output: SharedOutput<W>,
}

impl<W: Write + Send> RfbEncoder<W> {
    /// Creates an encoder writing to `output`
    #[must_use]
    pub const fn new(output: SharedOutput<W>) -> Self {
        Self { output }
    }

    /// Returns the shared output, e.g. to hand to the clipboard handler
    #[must_use]
    pub const fn output(&self) -> &SharedOutput<W> {
        &self.output
    }
}

fn encode_key(event: &NormalizedKeyEvent, buf: &mut BytesMut) -> EncodeResult<()> {
    let RemoteKey::Keysym(keysym) = event.key else {
        return Err(unsupported_key(RemoteProtocol::Rfb, event.key));
    };
    buf.put_u8(CLIENT_MSG_KEY_EVENT);
    buf.put_u8(u8::from(event.down));
    buf.put_u16(0); // padding
    buf.put_u32(keysym);
    Ok(())
}

fn encode_pointer(event: &NormalizedPointerEvent, buf: &mut BytesMut) {
    buf.put_u8(CLIENT_MSG_POINTER_EVENT);
    buf.put_u8(event.buttons);
    buf.put_u16(event.x);
    buf.put_u16(event.y);
}

impl<W: Write + Send> ProtocolEncoder for RfbEncoder<W> {
    fn protocol(&self) -> RemoteProtocol {
        RemoteProtocol::Rfb
    }

    fn send_events(&mut self, events: &[InputEvent]) -> EncodeResult<()> {
        let mut buf = BytesMut::with_capacity(events.len() * KEY_EVENT_LEN);
        for event in events {
            match event {
                InputEvent::Key(key) => {
                    trace!("RFB key event: {} down={}", key.key, key.down);
                    encode_key(key, &mut buf)?;
                }
                InputEvent::Pointer(pointer) => {
                    trace!(
                        "RFB pointer event: x={}, y={}, mask={:#04x}",
                        pointer.x,
                        pointer.y,
                        pointer.buttons
                    );
                    encode_pointer(pointer, &mut buf);
                }
            }
        }
        if buf.is_empty() {
            return Ok(());
        }

        self.output.with(|stream| {
            stream.write_all(&buf)?;
            stream.flush()?;
            Ok(())
        })
    }
}
