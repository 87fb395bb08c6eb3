//! Extended Clipboard framing
//!
//! Clipboard data rides inside RFB cut-text messages:
//!
//! ```text
//! u8  message type (6 client, 3 server)
//! u8  padding x3
//! i32 length        negative: Extended Clipboard, |length| bytes follow
//! u32 flags         action bits 24..28, format bits 0..15
//! ..  payload
//! ```
//!
//! A non-negative length is a legacy cut text of that many Latin-1 bytes.

use std::io::{self, Read};

use bytes::{BufMut, BytesMut};

use tracing::{trace, warn};

/// Message type: client cut text
pub const CLIENT_MSG_CLIENT_CUT_TEXT: u8 = 6;
/// Message type: server cut text
pub const SERVER_MSG_SERVER_CUT_TEXT: u8 = 3;

/// Largest inbound message body accepted; larger ones are skipped
pub const MAX_MESSAGE_LEN: u32 = 65_536;
/// Largest decompressed clipboard payload accepted
pub const MAX_TEXT_LEN: usize = 131_072;

/// Header length: type, padding and length field
pub const HEADER_LEN: usize = 8;

/// Extended Clipboard flag bits
pub mod flags {
    /// Text format (UTF-8)
    pub const UTF8: u32 = 1 << 0;
    /// Capability announcement
    pub const CAPS: u32 = 1 << 24;
    /// Data request
    pub const REQUEST: u32 = 1 << 25;
    /// Peek request (answered implicitly by the next notify)
    pub const PEEK: u32 = 1 << 26;
    /// Change notification
    pub const NOTIFY: u32 = 1 << 27;
    /// Data delivery
    pub const PROVIDE: u32 = 1 << 28;
    /// Bits holding the action
    pub const ACTION_MASK: u32 = 0xFF00_0000;
    /// Bits holding the formats
    pub const FORMAT_MASK: u32 = 0x0000_FFFF;
}

/// Action of an Extended Clipboard message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipboardMessageType {
    /// Capability announcement
    Caps,
    /// Data request
    Request,
    /// Change notification
    Notify,
    /// Data delivery
    Provide,
    /// Skipped, oversized or unsupported
    Unknown,
}

impl ClipboardMessageType {
    /// Classifies a flags word
    ///
    /// When several action bits are set the first of CAPS, REQUEST, NOTIFY,
    /// PROVIDE wins.
    #[must_use]
    pub const fn from_flags(flags: u32) -> Self {
        if flags & flags::CAPS != 0 {
            Self::Caps
        } else if flags & flags::REQUEST != 0 {
            Self::Request
        } else if flags & flags::NOTIFY != 0 {
            Self::Notify
        } else if flags & flags::PROVIDE != 0 {
            Self::Provide
        } else {
            Self::Unknown
        }
    }
}

/// An inbound Extended Clipboard message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardMessage {
    /// The action
    pub kind: ClipboardMessageType,
    /// Raw flags word
    pub flags: u32,
    /// Action payload
    pub payload: Vec<u8>,
}

impl ClipboardMessage {
    /// A message whose body was skipped
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            kind: ClipboardMessageType::Unknown,
            flags: 0,
            payload: Vec::new(),
        }
    }

    /// Returns true if the UTF-8 text format bit is set
    #[must_use]
    pub const fn has_utf8(&self) -> bool {
        self.flags & flags::UTF8 != 0
    }
}

/// Body of a server cut-text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCutText {
    /// Extended Clipboard message
    Extended(ClipboardMessage),
    /// Legacy Latin-1 text; `None` when the body was skipped
    Legacy(Option<String>),
}

/// Discards exactly `len` bytes, keeping the stream aligned
///
/// # Errors
///
/// Returns `UnexpectedEof` if the stream ends first.
pub fn skip_bytes<R: Read + ?Sized>(reader: &mut R, len: u64) -> io::Result<()> {
    let skipped = io::copy(&mut reader.take(len), &mut io::sink())?;
    if skipped < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("stream ended after {skipped} of {len} bytes"),
        ));
    }
    Ok(())
}

fn read_u32<R: Read + ?Sized>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Reads an Extended Clipboard body of `len` bytes
///
/// Bodies longer than [`MAX_MESSAGE_LEN`] or too short to hold the flags
/// word are skipped and returned as [`ClipboardMessageType::Unknown`].
///
/// # Errors
///
/// Returns an error only if the stream fails.
pub fn read_message<R: Read + ?Sized>(reader: &mut R, len: u32) -> io::Result<ClipboardMessage> {
    if len > MAX_MESSAGE_LEN || len < 4 {
        warn!("Skipping Extended Clipboard message of {len} bytes");
        skip_bytes(reader, u64::from(len))?;
        return Ok(ClipboardMessage::unknown());
    }

    let flags = read_u32(reader)?;
    let mut payload = vec![0u8; len as usize - 4];
    reader.read_exact(&mut payload)?;

    let kind = ClipboardMessageType::from_flags(flags);
    trace!(
        "Extended Clipboard {kind:?}: flags={flags:#010x}, {} payload bytes",
        payload.len()
    );
    Ok(ClipboardMessage {
        kind,
        flags,
        payload,
    })
}

/// Reads the rest of a server cut-text message, after its type byte
///
/// # Errors
///
/// Returns an error only if the stream fails.
pub fn read_server_cut_text<R: Read + ?Sized>(reader: &mut R) -> io::Result<ServerCutText> {
    let mut header = [0u8; HEADER_LEN - 1];
    reader.read_exact(&mut header)?;
    let length = i32::from_be_bytes([header[3], header[4], header[5], header[6]]);

    if length < 0 {
        return read_message(reader, length.unsigned_abs()).map(ServerCutText::Extended);
    }

    let len = length.unsigned_abs();
    if len > MAX_MESSAGE_LEN {
        warn!("Skipping legacy cut text of {len} bytes");
        skip_bytes(reader, u64::from(len))?;
        return Ok(ServerCutText::Legacy(None));
    }
    let mut text = vec![0u8; len as usize];
    reader.read_exact(&mut text)?;
    // Latin-1 maps one byte to one code point
    Ok(ServerCutText::Legacy(Some(
        text.into_iter().map(char::from).collect(),
    )))
}

/// Encodes a client Extended Clipboard message
#[must_use]
pub fn encode_message(flags: u32, payload: &[u8]) -> BytesMut {
    let body_len = 4 + payload.len();
    let mut buf = BytesMut::with_capacity(HEADER_LEN + body_len);
    buf.put_u8(CLIENT_MSG_CLIENT_CUT_TEXT);
    buf.put_bytes(0, 3); // padding
    buf.put_i32(-(body_len as i32));
    buf.put_u32(flags);
    buf.put_slice(payload);
    buf
}

/// The client's CAPS message: UTF-8 text, all four actions
#[must_use]
pub fn encode_caps() -> BytesMut {
    let caps = flags::UTF8 | flags::CAPS | flags::REQUEST | flags::NOTIFY | flags::PROVIDE;
    encode_message(caps, &(MAX_TEXT_LEN as u32).to_be_bytes())
}

/// NOTIFY announcing UTF-8 text
#[must_use]
pub fn encode_notify() -> BytesMut {
    encode_message(flags::NOTIFY | flags::UTF8, &[])
}

/// REQUEST for UTF-8 text
#[must_use]
pub fn encode_request() -> BytesMut {
    encode_message(flags::REQUEST | flags::UTF8, &[])
}

/// PROVIDE carrying compressed UTF-8 text
#[must_use]
pub fn encode_provide(compressed: &[u8]) -> BytesMut {
    encode_message(flags::PROVIDE | flags::UTF8, compressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Counts bytes handed out by the inner reader
    struct CountingReader<R> {
        inner: R,
        consumed: usize,
    }

    impl<R: Read> Read for CountingReader<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.consumed += n;
            Ok(n)
        }
    }

    #[test]
    fn test_oversized_message_is_skipped_exactly() {
        let mut data = vec![0xAB; 70_000];
        data.extend_from_slice(&[1, 2, 3]);
        let mut reader = CountingReader {
            inner: Cursor::new(data),
            consumed: 0,
        };
        let message = read_message(&mut reader, 70_000).unwrap();
        assert_eq!(message.kind, ClipboardMessageType::Unknown);
        assert!(message.payload.is_empty());
        assert_eq!(reader.consumed, 70_000);

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, vec![1, 2, 3]);
    }

    #[test]
    fn test_short_message_is_skipped() {
        let mut reader = Cursor::new(vec![0, 0]);
        let message = read_message(&mut reader, 2).unwrap();
        assert_eq!(message.kind, ClipboardMessageType::Unknown);
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn test_truncated_skip_is_an_error() {
        let mut reader = Cursor::new(vec![0; 10]);
        let err = read_message(&mut reader, 70_000).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_action_priority() {
        assert_eq!(
            ClipboardMessageType::from_flags(flags::CAPS | flags::PROVIDE),
            ClipboardMessageType::Caps
        );
        assert_eq!(
            ClipboardMessageType::from_flags(flags::NOTIFY | flags::PROVIDE),
            ClipboardMessageType::Notify
        );
        assert_eq!(
            ClipboardMessageType::from_flags(flags::PEEK | flags::UTF8),
            ClipboardMessageType::Unknown
        );
    }

    #[test]
    fn test_encode_caps() {
        let caps = encode_caps();
        assert_eq!(&caps[..4], &[6, 0, 0, 0]);
        assert_eq!(i32::from_be_bytes([caps[4], caps[5], caps[6], caps[7]]), -8);
        assert_eq!(
            u32::from_be_bytes([caps[8], caps[9], caps[10], caps[11]]),
            0x1B00_0001
        );
        assert_eq!(u32::from_be_bytes([caps[12], caps[13], caps[14], caps[15]]), 131_072);
    }

    #[test]
    fn test_encode_message_framing() {
        let message = encode_provide(b"xyz");
        assert_eq!(
            &message[..],
            &[6, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xF9, 0x10, 0x00, 0x00, 0x01, b'x', b'y', b'z'][..]
        );
    }

    #[test]
    fn test_read_server_extended_message() {
        let mut server = encode_notify();
        server[0] = SERVER_MSG_SERVER_CUT_TEXT;
        let mut reader = Cursor::new(server[1..].to_vec());
        let ServerCutText::Extended(message) = read_server_cut_text(&mut reader).unwrap() else {
            panic!("expected an extended message");
        };
        assert_eq!(message.kind, ClipboardMessageType::Notify);
        assert!(message.has_utf8());
    }

    #[test]
    fn test_read_legacy_latin1() {
        let mut data = vec![0, 0, 0, 0, 0, 0, 3];
        data.extend_from_slice(&[b'c', 0xE9, b'!']);
        let text = read_server_cut_text(&mut Cursor::new(data)).unwrap();
        assert_eq!(text, ServerCutText::Legacy(Some("cé!".to_string())));
    }
}
