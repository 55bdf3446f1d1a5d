//! Message kinds
//!
//! The closed set of top-level types, keyed by their leading tag byte.

/// Message type, derived from the first byte on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MessageKind {
    SimpleString = b'+',
    Error = b'-',
    Integer = b':',
    BulkString = b'$',
    Array = b'*',
}

impl MessageKind {
    /// Every kind, in tag order used for reporting
    pub const ALL: [MessageKind; 5] = [
        MessageKind::SimpleString,
        MessageKind::Error,
        MessageKind::Integer,
        MessageKind::BulkString,
        MessageKind::Array,
    ];

    /// Map a leading byte to its kind, `None` for anything unrecognized
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'+' => Some(MessageKind::SimpleString),
            b'-' => Some(MessageKind::Error),
            b':' => Some(MessageKind::Integer),
            b'$' => Some(MessageKind::BulkString),
            b'*' => Some(MessageKind::Array),
            _ => None,
        }
    }

    /// The tag byte for this kind
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Position in `ALL`, used as a table index
    pub(crate) fn index(self) -> usize {
        match self {
            MessageKind::SimpleString => 0,
            MessageKind::Error => 1,
            MessageKind::Integer => 2,
            MessageKind::BulkString => 3,
            MessageKind::Array => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::SimpleString => "simple-string",
            MessageKind::Error => "error",
            MessageKind::Integer => "integer",
            MessageKind::BulkString => "bulk-string",
            MessageKind::Array => "array",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
