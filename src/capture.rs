//! Capture splitting
//!
//! Runs a recorded byte stream through a framer in fixed-size chunks, the
//! way a socket would deliver it.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::config::FrameLimits;
use crate::error::{Result, TapError};
use crate::protocol::{Framer, Message, MessageKind};

/// Totals gathered while splitting a capture
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitSummary {
    /// Messages emitted
    pub messages: usize,

    /// Bytes read from the source
    pub bytes_read: u64,

    /// Bytes left over that never formed a complete message
    pub trailing: usize,

    /// Message counts indexed like `MessageKind::ALL`
    pub per_kind: [usize; 5],
}

impl SplitSummary {
    pub fn count(&self, kind: MessageKind) -> usize {
        self.per_kind[kind.index()]
    }
}

/// Feed `reader` through a framer `chunk_size` bytes at a time.
///
/// Stops at the first protocol fault; messages emitted before it have
/// already reached `on_message`.
pub fn split_reader<R, F>(
    mut reader: R,
    chunk_size: usize,
    limits: FrameLimits,
    mut on_message: F,
) -> Result<SplitSummary>
where
    R: Read,
    F: FnMut(&Message),
{
    if chunk_size == 0 {
        return Err(TapError::Config("chunk size must be > 0".to_string()));
    }

    let mut summary = SplitSummary::default();
    let mut chunk = vec![0u8; chunk_size];

    let (trailing, bytes_read) = {
        let mut framer = Framer::with_limits(
            |message: Message| {
                summary.messages += 1;
                summary.per_kind[message.kind().index()] += 1;
                on_message(&message);
            },
            limits,
        );

        let mut bytes_read = 0u64;
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            bytes_read += n as u64;
            framer.feed(&chunk[..n])?;
        }
        tracing::debug!("Capture read {} bytes", bytes_read);
        (framer.pending(), bytes_read)
    };

    summary.trailing = trailing;
    summary.bytes_read = bytes_read;
    Ok(summary)
}

/// Split the capture stored at `path`
pub fn split_file<F>(
    path: &Path,
    chunk_size: usize,
    limits: FrameLimits,
    on_message: F,
) -> Result<SplitSummary>
where
    F: FnMut(&Message),
{
    let file = File::open(path)?;
    split_reader(file, chunk_size, limits, on_message)
}
