//! Clipboard text compression
//!
//! Text travels zlib-compressed inside PROVIDE messages, framed as
//! `[u32 length including NUL][UTF-8 bytes][NUL]` with CRLF line endings.
//!
//! Some servers (TurboVNC) end every message with a sync flush instead of
//! finishing the zlib stream, so inflation must accept a stream that stops
//! making progress. A stream that produces nothing at all is an error unless
//! it reports a proper end.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use tracing::{trace, warn};

use super::message::MAX_TEXT_LEN;
use crate::error::{ClipboardError, ClipboardResult};

/// Converts any line endings to CRLF
fn to_crlf(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}

/// Compresses clipboard text for a PROVIDE payload
///
/// # Errors
///
/// Returns [`ClipboardError::Compress`] if the framed text exceeds the
/// clipboard size limit or zlib fails.
pub fn compress_clipboard_text(text: &str) -> ClipboardResult<Vec<u8>> {
    let text = to_crlf(text);
    let bytes = text.as_bytes();
    let framed_len = bytes.len() + 1;
    if framed_len + 4 > MAX_TEXT_LEN {
        return Err(ClipboardError::Compress(format!(
            "clipboard text of {} bytes exceeds the {MAX_TEXT_LEN} byte limit",
            bytes.len()
        )));
    }

    let mut framed = Vec::with_capacity(framed_len + 4);
    framed.extend_from_slice(&(framed_len as u32).to_be_bytes());
    framed.extend_from_slice(bytes);
    framed.push(0);

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&framed)
        .map_err(|e| ClipboardError::Compress(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| ClipboardError::Compress(e.to_string()))
}

/// Inflates a PROVIDE payload, bounded to [`MAX_TEXT_LEN`] bytes
///
/// Returns the inflated bytes and whether the zlib stream ended.
fn inflate(data: &[u8]) -> ClipboardResult<(Vec<u8>, bool)> {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(MAX_TEXT_LEN);

    loop {
        let consumed = inflater.total_in() as usize;
        let produced = out.len();
        let status = inflater
            .decompress_vec(&data[consumed..], &mut out, FlushDecompress::Sync)
            .map_err(|e| ClipboardError::Decompress(e.to_string()))?;

        match status {
            Status::StreamEnd => return Ok((out, true)),
            Status::Ok | Status::BufError => {
                let progressed =
                    inflater.total_in() as usize != consumed || out.len() != produced;
                if !progressed || out.len() >= MAX_TEXT_LEN {
                    return Ok((out, false));
                }
            }
        }
    }
}

/// Parses `[u32 length][bytes][NUL]` out of inflated data
fn unframe(data: &[u8]) -> Option<String> {
    let Some((header, rest)) = data.split_first_chunk::<4>() else {
        warn!("Clipboard payload of {} bytes has no length field", data.len());
        return None;
    };
    let len = i32::from_be_bytes(*header);
    if len <= 0 || len as usize > rest.len() {
        warn!(
            "Invalid clipboard text length {len} ({} bytes available)",
            rest.len()
        );
        return None;
    }

    let bytes = &rest[..len as usize];
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    let text = String::from_utf8_lossy(&bytes[..end]).replace("\r\n", "\n");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Decompresses a PROVIDE payload into text with LF line endings
///
/// Returns `Ok(None)` when the payload carries no text or its framing is
/// invalid.
///
/// # Errors
///
/// Returns [`ClipboardError::Decompress`] for corrupt data, or when the
/// stream produced no bytes without ending.
pub fn decompress_clipboard_text(data: &[u8]) -> ClipboardResult<Option<String>> {
    let (inflated, ended) = inflate(data)?;
    trace!(
        "Inflated {} clipboard bytes to {} (stream end: {ended})",
        data.len(),
        inflated.len()
    );

    if inflated.is_empty() {
        if ended {
            return Ok(None);
        }
        return Err(ClipboardError::Decompress(
            "no data produced before the stream stalled".to_string(),
        ));
    }
    Ok(unframe(&inflated))
}
