//! Property and scenario tests for the Extended Clipboard

use std::io::{self, Cursor, Read};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use proptest::prelude::*;
use tapdesk_core::clipboard::message::{
    encode_message, flags, read_message, CLIENT_MSG_CLIENT_CUT_TEXT, MAX_TEXT_LEN,
    SERVER_MSG_SERVER_CUT_TEXT,
};
use tapdesk_core::clipboard::{compress_clipboard_text, decompress_clipboard_text};
use tapdesk_core::{
    ClipboardDispatcher, ClipboardEvent, ClipboardEventProxy, ClipboardMessageType,
    ExtendedClipboard, InputSettings, ServerMessageHandler, SharedOutput,
};

/// Counts bytes handed out by the inner reader
struct CountingReader<R> {
    inner: R,
    count: usize,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n;
        Ok(n)
    }
}

/// Rejects every non-clipboard server message
struct NoOtherMessages;

impl ServerMessageHandler for NoOtherMessages {
    fn handle_message(&mut self, message_type: u8, _reader: &mut dyn Read) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unexpected server message {message_type}"),
        ))
    }
}

/// A server Extended Clipboard message
fn server_message(flag_bits: u32, payload: &[u8]) -> Vec<u8> {
    let mut message = encode_message(flag_bits, payload);
    message[0] = SERVER_MSG_SERVER_CUT_TEXT;
    message.to_vec()
}

/// Splits client output into (flags, payload) pairs
fn client_messages(bytes: &[u8]) -> Vec<(u32, Vec<u8>)> {
    let mut messages = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        assert_eq!(rest[0], CLIENT_MSG_CLIENT_CUT_TEXT);
        let len = i32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]);
        assert!(len < 0, "client sent a legacy cut text");
        let body = &rest[8..8 + len.unsigned_abs() as usize];
        let flag_bits = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
        messages.push((flag_bits, body[4..].to_vec()));
        rest = &rest[8 + body.len()..];
    }
    messages
}

type Harness = (
    ClipboardDispatcher<Vec<u8>, NoOtherMessages>,
    SharedOutput<Vec<u8>>,
    Receiver<ClipboardEvent>,
);

fn harness() -> Harness {
    harness_with(&InputSettings::default())
}

fn harness_with(settings: &InputSettings) -> Harness {
    let output = SharedOutput::new(Vec::new());
    let (proxy, events) = ClipboardEventProxy::channel();
    let clipboard = ExtendedClipboard::new(output.clone(), Arc::new(proxy))
        .with_allowed(settings.clipboard.enabled);
    let clipboard = Arc::new(clipboard);
    (
        ClipboardDispatcher::new(clipboard, NoOtherMessages),
        output,
        events,
    )
}

fn sent(output: &SharedOutput<Vec<u8>>) -> Vec<(u32, Vec<u8>)> {
    client_messages(&output.lock().unwrap())
}

fn feed(dispatcher: &mut ClipboardDispatcher<Vec<u8>, NoOtherMessages>, bytes: Vec<u8>) {
    dispatcher.dispatch(&mut Cursor::new(bytes)).unwrap();
}

const SERVER_CAPS: u32 =
    flags::UTF8 | flags::CAPS | flags::REQUEST | flags::NOTIFY | flags::PROVIDE;

#[test]
fn test_announce_gated_on_caps() {
    let (mut dispatcher, output, _events) = harness();
    dispatcher.clipboard().announce_clipboard_change("x").unwrap();
    assert!(output.lock().unwrap().is_empty());

    feed(
        &mut dispatcher,
        server_message(SERVER_CAPS, &(MAX_TEXT_LEN as u32).to_be_bytes()),
    );
    let after_caps = sent(&output).len();
    dispatcher.clipboard().announce_clipboard_change("x").unwrap();

    let messages = sent(&output);
    assert_eq!(messages.len(), after_caps + 1);
    assert_eq!(
        messages.last().unwrap(),
        &(flags::NOTIFY | flags::UTF8, Vec::new())
    );
}

#[test]
fn test_oversized_message_is_skipped_exactly() {
    let mut stream = vec![0xAB; 70_000];
    stream.extend_from_slice(&[1, 2, 3]);
    let mut reader = CountingReader {
        inner: Cursor::new(stream),
        count: 0,
    };

    let message = read_message(&mut reader, 70_000).unwrap();
    assert_eq!(message.kind, ClipboardMessageType::Unknown);
    assert!(message.payload.is_empty());
    assert_eq!(reader.count, 70_000);
}

#[test]
fn test_full_clipboard_exchange() {
    let (mut dispatcher, output, events) = harness();

    // Server CAPS is answered with the client's CAPS
    feed(
        &mut dispatcher,
        server_message(SERVER_CAPS, &(MAX_TEXT_LEN as u32).to_be_bytes()),
    );
    assert!(dispatcher.clipboard().is_enabled());
    assert_eq!(
        sent(&output),
        vec![(0x1B00_0001, (MAX_TEXT_LEN as u32).to_be_bytes().to_vec())]
    );

    // Local change is announced
    dispatcher.clipboard().announce_clipboard_change("abc").unwrap();
    assert_eq!(sent(&output)[1], (flags::NOTIFY | flags::UTF8, Vec::new()));

    // Server asks for it
    feed(&mut dispatcher, server_message(flags::REQUEST | flags::UTF8, &[]));
    let messages = sent(&output);
    assert_eq!(messages.len(), 3);
    let (provide_flags, payload) = &messages[2];
    assert_eq!(*provide_flags, flags::PROVIDE | flags::UTF8);
    assert_eq!(
        decompress_clipboard_text(payload).unwrap().as_deref(),
        Some("abc")
    );
    assert_eq!(dispatcher.clipboard().state().unwrap().pending_outbound(), None);

    // Server provides its own text
    let remote = compress_clipboard_text("xyz").unwrap();
    feed(
        &mut dispatcher,
        server_message(flags::PROVIDE | flags::UTF8, &remote),
    );
    assert_eq!(events.try_recv(), Ok(ClipboardEvent::Received("xyz".to_string())));
    assert_eq!(sent(&output).len(), 3);
}

#[test]
fn test_disabled_in_settings_ignores_server() {
    let settings: InputSettings = toml::from_str("[clipboard]\nenabled = false\n").unwrap();
    let (mut dispatcher, output, events) = harness_with(&settings);

    let mut stream = server_message(SERVER_CAPS, &(MAX_TEXT_LEN as u32).to_be_bytes());
    stream.extend(server_message(flags::NOTIFY | flags::UTF8, &[]));
    let mut reader = Cursor::new(stream);
    dispatcher.dispatch(&mut reader).unwrap();
    dispatcher.dispatch(&mut reader).unwrap();
    dispatcher.clipboard().announce_clipboard_change("local").unwrap();

    assert!(!dispatcher.clipboard().is_enabled());
    assert!(output.lock().unwrap().is_empty());
    assert!(events.try_recv().is_err());
}

#[test]
fn test_server_notify_is_answered_with_request() {
    let (mut dispatcher, output, _events) = harness();
    let mut stream = server_message(SERVER_CAPS, &(MAX_TEXT_LEN as u32).to_be_bytes());
    stream.extend(server_message(flags::NOTIFY | flags::UTF8, &[]));

    let mut reader = Cursor::new(stream);
    dispatcher.dispatch(&mut reader).unwrap();
    dispatcher.dispatch(&mut reader).unwrap();

    let messages = sent(&output);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1], (flags::REQUEST | flags::UTF8, Vec::new()));
}

proptest! {
    #[test]
    fn prop_compress_round_trip(text in "[a-zA-Z0-9 \n\t.,;é日本語]{1,200}") {
        let compressed = compress_clipboard_text(&text).unwrap();
        let restored = decompress_clipboard_text(&compressed).unwrap();
        prop_assert_eq!(restored.as_deref(), Some(text.as_str()));

        // Applying it to the canonical text changes nothing
        let canonical = restored.clone().unwrap();
        let again = compress_clipboard_text(&canonical).unwrap();
        prop_assert_eq!(decompress_clipboard_text(&again).unwrap(), restored);
    }

    #[test]
    fn prop_crlf_is_canonicalized(lines in prop::collection::vec("[a-z]{0,10}", 1..8)) {
        let crlf = lines.join("\r\n");
        let lf = lines.join("\n");
        prop_assume!(!lf.is_empty());

        let compressed = compress_clipboard_text(&crlf).unwrap();
        prop_assert_eq!(
            decompress_clipboard_text(&compressed).unwrap(),
            Some(lf)
        );
    }

    #[test]
    fn prop_action_priority(action_bits in 0u32..32, format in any::<u16>()) {
        let flag_bits = (action_bits << 24) | u32::from(format);
        let expected = if flag_bits & flags::CAPS != 0 {
            ClipboardMessageType::Caps
        } else if flag_bits & flags::REQUEST != 0 {
            ClipboardMessageType::Request
        } else if flag_bits & flags::NOTIFY != 0 {
            ClipboardMessageType::Notify
        } else if flag_bits & flags::PROVIDE != 0 {
            ClipboardMessageType::Provide
        } else {
            ClipboardMessageType::Unknown
        };
        prop_assert_eq!(ClipboardMessageType::from_flags(flag_bits), expected);
    }
}
