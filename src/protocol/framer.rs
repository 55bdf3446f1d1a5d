//! Stream framer
//!
//! Accumulates bytes from one direction of a stream and hands every complete
//! top-level message to a consumer, in order, exactly once.
//!
//! # Example
//!
//! ```
//! use resptap::protocol::{Framer, Message};
//!
//! let mut seen = Vec::new();
//! {
//!     let mut framer = Framer::new(|message: Message| seen.push(message));
//!     framer.feed(b"+OK\r").unwrap();
//!     framer.feed(b"\n:1\r\n").unwrap();
//! }
//! assert_eq!(seen.len(), 2);
//! assert_eq!(seen[0].as_bytes(), b"+OK\r\n");
//! ```

use bytes::BytesMut;

use crate::config::FrameLimits;
use crate::error::{FrameError, Result};
use super::scan::scan;
use super::Message;

/// Initial capacity of the pending buffer
const INITIAL_CAPACITY: usize = 4 * 1024;

/// Splits a byte stream into messages for a consumer.
///
/// The pending buffer is a `BytesMut`; extracted messages are split off its
/// front, so consumed bytes are dropped without shifting the remainder.
pub struct Framer<F> {
    /// Bytes received but not yet part of an emitted message
    buffer: BytesMut,

    /// Called once per complete message
    consumer: F,

    limits: FrameLimits,

    /// Set by the first protocol fault; the stream is dead afterwards
    poisoned: Option<FrameError>,
}

impl<F> Framer<F>
where
    F: FnMut(Message),
{
    /// Create a framer with default limits
    pub fn new(consumer: F) -> Self {
        Self::with_limits(consumer, FrameLimits::default())
    }

    /// Create a framer with custom limits
    pub fn with_limits(consumer: F, limits: FrameLimits) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY.min(limits.max_pending_bytes)),
            consumer,
            limits,
            poisoned: None,
        }
    }

    /// Append `data` and emit every message that is now complete.
    ///
    /// Returns how many messages this call emitted. On a protocol fault the
    /// framer keeps returning that fault and never emits again.
    pub fn feed(&mut self, data: &[u8]) -> Result<usize> {
        if let Some(err) = &self.poisoned {
            return Err(err.clone().into());
        }
        if data.is_empty() {
            return Ok(0);
        }

        self.buffer.extend_from_slice(data);

        let mut emitted = 0;
        loop {
            match self.next_message() {
                Ok(Some(message)) => {
                    tracing::trace!("Framed {}", message);
                    (self.consumer)(message);
                    emitted += 1;
                }
                Ok(None) => return Ok(emitted),
                Err(err) => {
                    tracing::debug!(
                        "Framer poisoned after {} messages this feed: {}",
                        emitted,
                        err
                    );
                    self.buffer.clear();
                    self.poisoned = Some(err.clone());
                    return Err(err.into());
                }
            }
        }
    }

    /// Try to extract a single message from the front of the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(message))` if a complete message was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` on a protocol fault or when the buffer outgrows its limit
    fn next_message(&mut self) -> std::result::Result<Option<Message>, FrameError> {
        match scan(&self.buffer, &self.limits)? {
            Some(found) => {
                let wire = self.buffer.split_to(found.wire_len).freeze();
                let bytes = found.render(wire);
                Ok(Some(Message::new(
                    found.kind,
                    bytes,
                    found.wire_len,
                    found.needs_rewrite(),
                )))
            }
            None if self.buffer.len() > self.limits.max_pending_bytes => {
                Err(FrameError::BufferOverflow {
                    pending: self.buffer.len(),
                    limit: self.limits.max_pending_bytes,
                })
            }
            None => Ok(None),
        }
    }
}

impl<F> Framer<F> {
    /// Number of buffered bytes awaiting completion
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Whether a protocol fault has ended this stream
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    pub fn limits(&self) -> &FrameLimits {
        &self.limits
    }

    /// Give back the consumer, dropping any buffered bytes
    pub fn into_consumer(self) -> F {
        self.consumer
    }
}

/// Split a complete byte sequence in one pass.
///
/// Trailing bytes that do not form a complete message are ignored; use a
/// `Framer` directly to keep them.
pub fn frame_all(data: &[u8], limits: FrameLimits) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    Framer::with_limits(|message: Message| messages.push(message), limits).feed(data)?;
    Ok(messages)
}
