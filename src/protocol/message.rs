//! Message definitions
//!
//! A complete top-level unit handed out by the framer.

use bytes::Bytes;

use super::MessageKind;

/// Default number of bytes shown by `Display`
const PREVIEW_LEN: usize = 64;

/// One complete, self-delimiting message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Kind taken from the leading byte
    kind: MessageKind,

    /// Message bytes (an array may carry a canonicalized header)
    bytes: Bytes,

    /// Bytes this message occupied on the wire
    wire_len: usize,

    /// True when at least one array header was rewritten
    rewritten: bool,
}

impl Message {
    pub(crate) fn new(kind: MessageKind, bytes: Bytes, wire_len: usize, rewritten: bool) -> Self {
        Self {
            kind,
            bytes,
            wire_len,
            rewritten,
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Length of the emitted bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a message holds at least its tag and CRLF
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of bytes consumed from the stream for this message
    pub fn wire_len(&self) -> usize {
        self.wire_len
    }

    /// Whether the emitted bytes differ from the wire bytes
    pub fn is_rewritten(&self) -> bool {
        self.rewritten
    }

    /// Null bulk string (`$-1`) or null array (`*-1`)
    pub fn is_null(&self) -> bool {
        matches!(self.kind, MessageKind::BulkString | MessageKind::Array)
            && self.bytes[1..] == *b"-1\r\n"
    }

    /// Printable rendering of at most `max` bytes, escaping control bytes
    pub fn preview(&self, max: usize) -> String {
        let shown = &self.bytes[..self.bytes.len().min(max)];
        let mut out: String = shown
            .iter()
            .flat_map(|&b| std::ascii::escape_default(b))
            .map(char::from)
            .collect();
        if self.bytes.len() > max {
            out.push_str("...");
        }
        out
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} bytes) {}", self.kind, self.len(), self.preview(PREVIEW_LEN))
    }
}
