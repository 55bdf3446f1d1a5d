//! Traffic statistics
//!
//! Counters shared by every connection of a relay.

use parking_lot::Mutex;

use crate::protocol::MessageKind;

/// Direction of a relayed byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::ClientToServer, Direction::ServerToClient];

    fn index(self) -> usize {
        match self {
            Direction::ClientToServer => 0,
            Direction::ServerToClient => 1,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::ClientToServer => f.write_str("client->server"),
            Direction::ServerToClient => f.write_str("server->client"),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub connections_accepted: u64,
    pub connections_active: u64,
    bytes: [u64; 2],
    protocol_errors: [u64; 2],
    messages: [[u64; 5]; 2],
}

impl StatsSnapshot {
    /// Bytes forwarded in `direction`
    pub fn bytes(&self, direction: Direction) -> u64 {
        self.bytes[direction.index()]
    }

    /// Streams closed because of a protocol fault in `direction`
    pub fn protocol_errors(&self, direction: Direction) -> u64 {
        self.protocol_errors[direction.index()]
    }

    /// Messages of `kind` framed in `direction`
    pub fn messages(&self, direction: Direction, kind: MessageKind) -> u64 {
        self.messages[direction.index()][kind.index()]
    }

    /// All messages framed in `direction`
    pub fn total_messages(&self, direction: Direction) -> u64 {
        self.messages[direction.index()].iter().sum()
    }
}

/// Shared, lock-protected relay counters
#[derive(Debug, Default)]
pub struct TapStats {
    inner: Mutex<StatsSnapshot>,
}

impl TapStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        let mut inner = self.inner.lock();
        inner.connections_accepted += 1;
        inner.connections_active += 1;
    }

    pub fn connection_closed(&self) {
        let mut inner = self.inner.lock();
        inner.connections_active = inner.connections_active.saturating_sub(1);
    }

    pub fn record_bytes(&self, direction: Direction, count: usize) {
        self.inner.lock().bytes[direction.index()] += count as u64;
    }

    pub fn record_message(&self, direction: Direction, kind: MessageKind) {
        self.inner.lock().messages[direction.index()][kind.index()] += 1;
    }

    pub fn record_protocol_error(&self, direction: Direction) {
        self.inner.lock().protocol_errors[direction.index()] += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.inner.lock().clone()
    }
}
