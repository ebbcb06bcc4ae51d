//! Incremental decoder for the event-stream wire format.
//!
//! Bytes arrive from the network in chunks of arbitrary size. A chunk can
//! end in the middle of a block, in the middle of a line, or even in the
//! middle of a multi-byte UTF-8 character. [`FrameDecoder`] keeps whatever
//! is unfinished and only emits an event once its whole block has arrived.
//!
//! The key property: feeding the same bytes split at *any* boundaries
//! produces exactly the same events, in the same order, as feeding them
//! all at once.

use crate::{Payload, StreamEvent, DEFAULT_EVENT_TYPE};

/// Blocks are terminated by an empty line, i.e. two line feeds in a row.
const BLOCK_TERMINATOR: &str = "\n\n";

/// Stateful decoder for one connection's byte stream.
///
/// Create one per connection attempt (or [`reset`](Self::reset) it):
/// leftovers from a previous connection must never bleed into the next.
///
/// ```rust
/// use muforge_protocol::{FrameDecoder, Payload};
///
/// let mut decoder = FrameDecoder::new();
/// assert!(decoder.push(b"event: Foo\nda").is_empty());
///
/// let events = decoder.push(b"ta: {\"a\":1}\n\n");
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].event_type, "Foo");
/// assert_eq!(events[0].payload, Payload::parse(r#"{"a":1}"#));
/// ```
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Bytes of an incomplete UTF-8 sequence at the end of the last chunk.
    undecoded: Vec<u8>,
    /// A `\r` that might be the first half of a `\r\n` line ending.
    pending_cr: bool,
    /// Decoded text since the last block terminator.
    buffer: String,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns every event completed by it, in wire order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.decode_utf8(chunk);
        self.drain_blocks()
    }

    /// The unterminated tail: text received since the last complete block.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Called at end of stream. An unterminated final block is incomplete
    /// by definition and is dropped, never dispatched.
    pub fn finish(&mut self) {
        if !self.buffer.trim().is_empty() || !self.undecoded.is_empty() {
            tracing::trace!(
                buffered = self.buffer.len(),
                undecoded = self.undecoded.len(),
                "discarding unterminated block at end of stream"
            );
        }
        self.reset();
    }

    /// Drops all buffered state.
    pub fn reset(&mut self) {
        self.undecoded.clear();
        self.pending_cr = false;
        self.buffer.clear();
    }

    /// Appends `chunk` to the text buffer, decoding UTF-8 across chunk
    /// boundaries. Invalid sequences become U+FFFD; an incomplete sequence
    /// at the very end waits for the next chunk.
    fn decode_utf8(&mut self, chunk: &[u8]) {
        self.undecoded.extend_from_slice(chunk);
        let bytes = std::mem::take(&mut self.undecoded);

        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.append_text(text);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // `valid` is exactly the prefix `from_utf8` accepted,
                    // so the lossy conversion never substitutes anything.
                    self.append_text(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            self.append_text("\u{FFFD}");
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }
        self.undecoded = rest.to_vec();
    }

    /// Appends decoded text, folding `\r\n` into `\n`.
    ///
    /// The `\r` is held back until the next character is known, which keeps
    /// the result independent of where chunk boundaries fall.
    fn append_text(&mut self, text: &str) {
        for ch in text.chars() {
            if self.pending_cr {
                self.pending_cr = false;
                if ch != '\n' {
                    self.buffer.push('\r');
                }
            }
            if ch == '\r' {
                self.pending_cr = true;
            } else {
                self.buffer.push(ch);
            }
        }
    }

    /// Splits every complete block off the front of the buffer.
    fn drain_blocks(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(end) = self.buffer.find(BLOCK_TERMINATOR) {
            let rest = self.buffer.split_off(end + BLOCK_TERMINATOR.len());
            let block = std::mem::replace(&mut self.buffer, rest);
            if let Some(event) = parse_block(&block[..end]) {
                tracing::trace!(event_type = %event.event_type, "decoded frame");
                events.push(event);
            }
        }
        events
    }
}

/// Parses one block (without its terminating blank line) into an event.
///
/// - `event: <name>` sets the event type; the first non-empty one wins.
/// - `data: <text>` adds one payload line (leading whitespace trimmed);
///   several are joined with `\n`.
/// - `:` starts a comment; blank lines and unknown fields are ignored.
///
/// Returns `None` when the block has no `data:` line at all: an event
/// without a payload carries nothing worth delivering.
pub fn parse_block(block: &str) -> Option<StreamEvent> {
    let mut event_type: Option<&str> = None;
    let mut data: Vec<&str> = Vec::new();

    for line in block.split('\n') {
        if line.trim().is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("event:") {
            let value = value.trim();
            if event_type.is_none() && !value.is_empty() {
                event_type = Some(value);
            }
        } else if let Some(value) = line.strip_prefix("data:") {
            data.push(value.trim_start());
        }
    }

    if data.is_empty() {
        return None;
    }

    let text = data.join("\n");
    Some(StreamEvent::new(
        event_type.unwrap_or(DEFAULT_EVENT_TYPE),
        Payload::parse(text),
    ))
}

// =========================================================================
// Tests
// =========================================================================
