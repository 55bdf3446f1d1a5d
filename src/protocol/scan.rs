//! Boundary detection
//!
//! Pure functions that decide whether a byte span starts with one complete
//! message, and how long it is. Nothing here owns a buffer.
//!
//! ## Wire Format
//! ```text
//! +<text>\r\n                      simple string
//! -<text>\r\n                      error
//! :<text>\r\n                      integer
//! $<len>\r\n<len bytes>\r\n        bulk string   ($-1\r\n is null)
//! *<count>\r\n<count messages>     array         (*-1\r\n null, *0\r\n empty)
//! ```
//!
//! Arrays nest arbitrarily. Nesting is walked with an explicit stack of
//! "elements remaining" counters, so input depth never turns into call depth.

use bytes::{Bytes, BytesMut};

use crate::config::FrameLimits;
use crate::error::{FrameError, LengthField};
use super::MessageKind;

/// Line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Smallest possible element on the wire (`:\r\n`)
const MIN_ELEMENT_LEN: usize = 3;

/// Longest token echoed back inside an error
const MAX_TOKEN_ECHO: usize = 32;

/// Outcome of a successful scan: the span's prefix is one complete message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    /// Kind of the top-level message
    pub kind: MessageKind,

    /// Bytes the message occupies on the wire
    pub wire_len: usize,

    /// Array headers whose count token is not in canonical form
    rewrites: Vec<HeaderRewrite>,
}

/// An array header to replace with `*<count>\r\n` when rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeaderRewrite {
    offset: usize,
    len: usize,
    count: usize,
}

impl Scan {
    /// Whether rendering changes any bytes
    pub fn needs_rewrite(&self) -> bool {
        !self.rewrites.is_empty()
    }

    /// Produce the emitted bytes from the `wire_len` bytes that were scanned.
    ///
    /// Without rewrites this hands back `wire` untouched (no copy).
    pub fn render(&self, wire: Bytes) -> Bytes {
        if self.rewrites.is_empty() {
            return wire;
        }

        let mut out = BytesMut::with_capacity(wire.len());
        let mut cursor = 0;
        for rewrite in &self.rewrites {
            out.extend_from_slice(&wire[cursor..rewrite.offset]);
            out.extend_from_slice(format!("*{}\r\n", rewrite.count).as_bytes());
            cursor = rewrite.offset + rewrite.len;
        }
        out.extend_from_slice(&wire[cursor..]);
        out.freeze()
    }
}

/// Find the first CRLF at or after `from`, returning its offset
pub fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    if from >= buf.len() {
        return None;
    }
    buf[from..]
        .windows(2)
        .position(|w| w == CRLF)
        .map(|i| from + i)
}

/// Scan `buf` for one complete message at its start.
///
/// Returns:
/// - `Ok(Some(scan))` if a complete message is present
/// - `Ok(None)` if more bytes are needed
/// - `Err(...)` if the bytes can never form a valid message
pub fn scan(buf: &[u8], limits: &FrameLimits) -> Result<Option<Scan>, FrameError> {
    let kind = match buf.first() {
        Some(&tag) => MessageKind::from_tag(tag).ok_or(FrameError::UnknownType { byte: tag })?,
        None => return Ok(None),
    };

    // Remaining element count of every open array, innermost last
    let mut open: Vec<usize> = Vec::new();
    let mut rewrites = Vec::new();
    let mut pos = 0;

    loop {
        let tag = match buf.get(pos) {
            Some(&tag) => tag,
            None => return Ok(None),
        };
        let element = MessageKind::from_tag(tag).ok_or(FrameError::UnknownType { byte: tag })?;

        match element {
            MessageKind::SimpleString | MessageKind::Error | MessageKind::Integer => {
                match find_crlf(buf, pos + 1) {
                    Some(end) => pos = end + CRLF.len(),
                    None => return Ok(None),
                }
            }

            MessageKind::BulkString => {
                let (len, header_end) = match read_length(buf, pos, LengthField::BulkLength)? {
                    Some(header) => header,
                    None => return Ok(None),
                };
                pos = match len {
                    -1 => header_end,
                    len if len < -1 => {
                        return Err(invalid_length(LengthField::BulkLength, &buf[pos + 1..header_end - 2]))
                    }
                    len => {
                        let total = usize::try_from(len)
                            .ok()
                            .and_then(|len| header_end.checked_add(len))
                            .and_then(|end| end.checked_add(CRLF.len()))
                            .unwrap_or(usize::MAX);
                        if total > limits.max_pending_bytes {
                            return Err(FrameError::BufferOverflow {
                                pending: total,
                                limit: limits.max_pending_bytes,
                            });
                        }
                        if buf.len() < total {
                            return Ok(None);
                        }
                        if &buf[total - CRLF.len()..total] != CRLF {
                            return Err(FrameError::MissingTerminator);
                        }
                        total
                    }
                };
            }

            MessageKind::Array => {
                let (count, header_end) = match read_length(buf, pos, LengthField::ArrayCount)? {
                    Some(header) => header,
                    None => return Ok(None),
                };
                if count > 0 {
                    if open.len() >= limits.max_nesting_depth {
                        return Err(FrameError::NestingTooDeep {
                            limit: limits.max_nesting_depth,
                        });
                    }
                    let count = usize::try_from(count).unwrap_or(usize::MAX);
                    let smallest = count
                        .saturating_mul(MIN_ELEMENT_LEN)
                        .saturating_add(header_end);
                    if smallest > limits.max_pending_bytes {
                        return Err(FrameError::BufferOverflow {
                            pending: smallest,
                            limit: limits.max_pending_bytes,
                        });
                    }
                    if !is_canonical_count(&buf[pos + 1..header_end - CRLF.len()]) {
                        rewrites.push(HeaderRewrite {
                            offset: pos,
                            len: header_end - pos,
                            count,
                        });
                    }
                    open.push(count);
                    pos = header_end;
                    continue;
                }
                // Null and empty arrays end right after the header
                pos = header_end;
            }
        }

        // One element finished; close every array it completes
        loop {
            match open.last_mut() {
                None => {
                    return Ok(Some(Scan {
                        kind,
                        wire_len: pos,
                        rewrites,
                    }))
                }
                Some(remaining) => {
                    *remaining -= 1;
                    if *remaining > 0 {
                        break;
                    }
                    open.pop();
                }
            }
        }
    }
}

/// Read the signed length token of the header starting at `start`.
///
/// Returns the parsed value and the offset just past the header's CRLF.
fn read_length(
    buf: &[u8],
    start: usize,
    field: LengthField,
) -> Result<Option<(i64, usize)>, FrameError> {
    let end = match find_crlf(buf, start + 1) {
        Some(end) => end,
        None => return Ok(None),
    };
    let token = &buf[start + 1..end];
    let value = std::str::from_utf8(token)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| invalid_length(field, token))?;
    Ok(Some((value, end + CRLF.len())))
}

fn invalid_length(field: LengthField, token: &[u8]) -> FrameError {
    let shown = &token[..token.len().min(MAX_TOKEN_ECHO)];
    FrameError::InvalidLength {
        field,
        token: String::from_utf8_lossy(shown).into_owned(),
    }
}

/// A positive count token is canonical unless it has a `+` sign or leading zero
fn is_canonical_count(token: &[u8]) -> bool {
    !matches!(token.first(), Some(b'+') | Some(b'0'))
}
