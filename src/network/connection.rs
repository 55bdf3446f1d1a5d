//! Connection Handler
//!
//! Relays one client connection to the upstream server, observing both
//! directions through their own framers.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, FrameLimits};
use crate::error::{Result, TapError};
use crate::protocol::{Framer, Message};
use super::stats::{Direction, TapStats};

/// A client connection paired with its upstream connection
pub struct Connection {
    /// Socket accepted from the client
    client: TcpStream,

    /// Socket opened to the real server
    upstream: TcpStream,

    /// Per-direction framer limits
    limits: FrameLimits,

    /// Read buffer size per direction
    buffer_size: usize,

    /// Shared relay counters
    stats: Arc<TapStats>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Connect to the upstream for an accepted client
    ///
    /// Sets up timeouts and disables Nagle on both sockets
    pub fn open(client: TcpStream, config: &Config, stats: Arc<TapStats>) -> Result<Self> {
        // Get peer address for logging before anything can fail
        let peer_addr = client
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let upstream = TcpStream::connect(&config.upstream_addr).map_err(|e| {
            TapError::Network(format!(
                "cannot reach upstream {} for {}: {}",
                config.upstream_addr, peer_addr, e
            ))
        })?;

        client.set_nodelay(true)?;
        upstream.set_nodelay(true)?;

        let connection = Self {
            client,
            upstream,
            limits: config.frame_limits,
            buffer_size: config.buffer_size,
            stats,
            peer_addr,
        };
        connection.set_timeouts(config.read_timeout_ms, config.write_timeout_ms)?;
        Ok(connection)
    }

    /// Configure timeouts on both sockets (0 leaves a timeout unset)
    pub fn set_timeouts(&self, read_ms: u64, write_ms: u64) -> Result<()> {
        for stream in [&self.client, &self.upstream] {
            if read_ms > 0 {
                stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
            }
            if write_ms > 0 {
                stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
            }
        }
        Ok(())
    }

    /// Relay both directions until either side closes (blocking)
    ///
    /// The server->client direction runs on a scoped thread. A protocol
    /// fault in either direction closes both sockets.
    pub fn handle(&self) -> Result<()> {
        tracing::debug!("Relaying {} via {:?}", self.peer_addr, self.upstream.peer_addr().ok());

        let (outbound, inbound) = crossbeam::scope(|s| {
            let inbound = s.spawn(|_| self.relay(&self.upstream, &self.client, Direction::ServerToClient));
            let outbound = self.relay(&self.client, &self.upstream, Direction::ClientToServer);
            (outbound, inbound.join())
        })
        .map_err(|_| TapError::Network(format!("relay scope for {} panicked", self.peer_addr)))?;

        let inbound = inbound
            .map_err(|_| TapError::Network(format!("relay thread for {} panicked", self.peer_addr)))?;

        tracing::debug!("Connection {} closed", self.peer_addr);
        outbound.and(inbound)
    }

    /// Copy `src` to `dst`, framing every chunk on the way through.
    ///
    /// Bytes reach `dst` exactly as read. A chunk that breaks the protocol is
    /// not forwarded; the connection is torn down instead.
    fn relay(&self, mut src: &TcpStream, mut dst: &TcpStream, direction: Direction) -> Result<()> {
        let peer = self.peer_addr.as_str();
        let stats = &self.stats;
        let mut framer = Framer::with_limits(
            |message: Message| {
                tracing::trace!("{} {}: {}", peer, direction, message);
                stats.record_message(direction, message.kind());
            },
            self.limits,
        );
        let mut buf = vec![0u8; self.buffer_size];

        loop {
            let n = match src.read(&mut buf) {
                Ok(0) => {
                    // Half-close: let the peer see EOF, keep the other direction running
                    tracing::debug!("{} {}: end of stream", peer, direction);
                    let _ = dst.shutdown(Shutdown::Write);
                    return Ok(());
                }
                Ok(n) => n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e) if is_disconnect(e.kind()) => {
                    tracing::debug!("{} {}: {}", peer, direction, e);
                    self.close();
                    return Ok(());
                }
                Err(e) => {
                    self.close();
                    return Err(e.into());
                }
            };

            if let Err(e) = framer.feed(&buf[..n]) {
                tracing::warn!("{} {}: closing connection: {}", peer, direction, e);
                stats.record_protocol_error(direction);
                self.close();
                return Err(e);
            }

            if let Err(e) = dst.write_all(&buf[..n]) {
                self.close();
                if is_disconnect(e.kind()) || e.kind() == ErrorKind::BrokenPipe {
                    tracing::debug!("{} {}: peer went away: {}", peer, direction, e);
                    return Ok(());
                }
                return Err(e.into());
            }
            stats.record_bytes(direction, n);
        }
    }

    /// Shut down both sockets, waking the other direction's reader
    fn close(&self) {
        let _ = self.client.shutdown(Shutdown::Both);
        let _ = self.upstream.shutdown(Shutdown::Both);
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Errors that mean the other end is gone (or idle past its timeout)
fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    )
}
