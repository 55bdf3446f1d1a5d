//! Tests for the observing relay
//!
//! These tests run a real relay on loopback in front of a scripted upstream
//! and verify:
//! - Bytes are forwarded unchanged in both directions
//! - Messages are counted per direction and kind
//! - A protocol fault closes the connection without forwarding the bad chunk
//! - An unreachable upstream drops the client

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver};
use resptap::network::{Direction, Server, StatsSnapshot};
use resptap::{Config, MessageKind};

// =============================================================================
// Helper Functions
// =============================================================================

const TIMEOUT: Duration = Duration::from_secs(5);

/// Upstream that reads `expect` bytes, replies, then reports everything it
/// received once the relay closes its side.
fn spawn_upstream(expect: usize, reply: &'static [u8]) -> (SocketAddr, Receiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = channel::bounded(1);

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(TIMEOUT)).unwrap();

        let mut received = vec![0u8; expect];
        stream.read_exact(&mut received).unwrap();
        stream.write_all(reply).unwrap();

        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest);
        received.extend_from_slice(&rest);
        let _ = tx.send(received);
    });

    (addr, rx)
}

fn start_relay(upstream: SocketAddr) -> (Arc<Server>, JoinHandle<resptap::Result<()>>) {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .upstream_addr(upstream.to_string())
        .workers(2)
        .read_timeout_ms(TIMEOUT.as_millis() as u64)
        .build();
    let server = Arc::new(Server::bind(config).unwrap());
    let runner = {
        let server = Arc::clone(&server);
        thread::spawn(move || server.run())
    };
    (server, runner)
}

fn connect(server: &Server) -> TcpStream {
    let stream = TcpStream::connect(server.local_addr().unwrap()).unwrap();
    stream.set_read_timeout(Some(TIMEOUT)).unwrap();
    stream
}

/// Wait until `count` connections were accepted and all have finished
fn wait_for_idle(server: &Server, count: u64) -> StatsSnapshot {
    let deadline = Instant::now() + TIMEOUT;
    loop {
        let snapshot = server.stats().snapshot();
        if snapshot.connections_accepted == count && snapshot.connections_active == 0 {
            return snapshot;
        }
        assert!(Instant::now() < deadline, "relay never went idle: {:?}", snapshot);
        thread::sleep(Duration::from_millis(10));
    }
}

fn stop(server: Arc<Server>, runner: JoinHandle<resptap::Result<()>>) {
    server.shutdown();
    runner.join().unwrap().unwrap();
}

// =============================================================================
// Forwarding Tests
// =============================================================================

#[test]
fn test_relay_forwards_and_counts() {
    let request: &[u8] = b"*1\r\n$4\r\nPING\r\n";
    let (upstream, received) = spawn_upstream(request.len(), b"+PONG\r\n");
    let (server, runner) = start_relay(upstream);

    let mut client = connect(&server);
    // Deliver the request in fragments that cut through the bulk header
    client.write_all(&request[..6]).unwrap();
    thread::sleep(Duration::from_millis(20));
    client.write_all(&request[6..]).unwrap();

    let mut reply = [0u8; 7];
    client.read_exact(&mut reply).unwrap();
    assert_eq!(&reply, b"+PONG\r\n");

    client.shutdown(Shutdown::Write).unwrap();
    let mut rest = Vec::new();
    client.read_to_end(&mut rest).unwrap();
    assert!(rest.is_empty());

    assert_eq!(received.recv_timeout(TIMEOUT).unwrap(), request.to_vec());

    let snapshot = wait_for_idle(&server, 1);
    assert_eq!(snapshot.messages(Direction::ClientToServer, MessageKind::Array), 1);
    assert_eq!(snapshot.total_messages(Direction::ClientToServer), 1);
    assert_eq!(snapshot.messages(Direction::ServerToClient, MessageKind::SimpleString), 1);
    assert_eq!(snapshot.bytes(Direction::ClientToServer), request.len() as u64);
    assert_eq!(snapshot.bytes(Direction::ServerToClient), 7);
    assert_eq!(snapshot.protocol_errors(Direction::ClientToServer), 0);

    stop(server, runner);
}

#[test]
fn test_relay_keeps_non_canonical_bytes_on_the_wire() {
    // The framer canonicalizes what it reports, never what it forwards
    let request: &[u8] = b"*01\r\n+x\r\n";
    let (upstream, received) = spawn_upstream(request.len(), b":1\r\n");
    let (server, runner) = start_relay(upstream);

    let mut client = connect(&server);
    client.write_all(request).unwrap();

    let mut reply = [0u8; 4];
    client.read_exact(&mut reply).unwrap();
    assert_eq!(&reply, b":1\r\n");
    client.shutdown(Shutdown::Write).unwrap();

    assert_eq!(received.recv_timeout(TIMEOUT).unwrap(), request.to_vec());
    let snapshot = wait_for_idle(&server, 1);
    assert_eq!(snapshot.messages(Direction::ClientToServer, MessageKind::Array), 1);
    assert_eq!(snapshot.messages(Direction::ServerToClient, MessageKind::Integer), 1);

    stop(server, runner);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_protocol_fault_closes_connection() {
    let (upstream, received) = spawn_upstream(0, b"");
    let (server, runner) = start_relay(upstream);

    let mut client = connect(&server);
    client.write_all(b"GET foo\r\n").unwrap();

    // Either a clean EOF or a reset, but never data
    let mut buf = [0u8; 16];
    match client.read(&mut buf) {
        Ok(n) => assert_eq!(n, 0),
        Err(e) => assert_ne!(e.kind(), std::io::ErrorKind::WouldBlock),
    }

    assert!(received.recv_timeout(TIMEOUT).unwrap().is_empty());

    let snapshot = wait_for_idle(&server, 1);
    assert_eq!(snapshot.protocol_errors(Direction::ClientToServer), 1);
    assert_eq!(snapshot.bytes(Direction::ClientToServer), 0);

    stop(server, runner);
}

#[test]
fn test_unreachable_upstream_drops_client() {
    // Reserve a port, then free it so nothing is listening there
    let upstream = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let (server, runner) = start_relay(upstream);

    let mut client = connect(&server);
    let mut buf = [0u8; 16];
    match client.read(&mut buf) {
        Ok(n) => assert_eq!(n, 0),
        Err(e) => assert_ne!(e.kind(), std::io::ErrorKind::WouldBlock),
    }

    let snapshot = wait_for_idle(&server, 1);
    assert_eq!(snapshot.total_messages(Direction::ClientToServer), 0);

    stop(server, runner);
}
