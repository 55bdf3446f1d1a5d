//! TCP Server
//!
//! Accepts client connections and dispatches them to worker threads, each
//! of which relays one connection at a time to the upstream server.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver};

use crate::config::Config;
use crate::error::{Result, TapError};
use super::connection::Connection;
use super::stats::TapStats;

/// How long the accept loop sleeps when no client is waiting
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Observing relay server
pub struct Server {
    config: Config,
    listener: TcpListener,
    stats: Arc<TapStats>,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Validate the config and bind the listen address
    pub fn bind(config: Config) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            TapError::Network(format!("cannot listen on {}: {}", config.listen_addr, e))
        })?;
        // Non-blocking accept so the shutdown flag is noticed
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            listener,
            stats: Arc::new(TapStats::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn stats(&self) -> Arc<TapStats> {
        Arc::clone(&self.stats)
    }

    /// Flag that stops the accept loop once set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Start the server (blocking)
    ///
    /// Returns after shutdown is signalled and every in-flight connection
    /// has finished.
    pub fn run(&self) -> Result<()> {
        let (sender, receiver) = channel::unbounded::<TcpStream>();
        let config = &self.config;
        let stats = &self.stats;

        tracing::info!(
            "Relaying {} -> {} with {} workers",
            config.listen_addr,
            config.upstream_addr,
            config.workers
        );

        crossbeam::scope(|s| {
            for id in 0..config.workers {
                let receiver = receiver.clone();
                s.spawn(move |_| worker_loop(id, receiver, config, stats));
            }
            drop(receiver);

            while !self.shutdown.load(Ordering::Relaxed) {
                match self.listener.accept() {
                    Ok((stream, addr)) => {
                        tracing::debug!("Accepted {}", addr);
                        if let Err(e) = stream.set_nonblocking(false) {
                            tracing::warn!("Dropping {}: {}", addr, e);
                            continue;
                        }
                        if sender.send(stream).is_err() {
                            return Err(TapError::Network("all workers exited".to_string()));
                        }
                    }
                    Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                        std::thread::sleep(ACCEPT_POLL_INTERVAL);
                    }
                    Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(e) => {
                        tracing::warn!("Accept failed: {}", e);
                        std::thread::sleep(ACCEPT_POLL_INTERVAL);
                    }
                }
            }

            tracing::info!("Shutdown requested, waiting for open connections");
            // Disconnecting the channel lets idle workers exit
            drop(sender);
            Ok(())
        })
        .map_err(|_| TapError::Network("worker thread panicked".to_string()))??;

        let snapshot = self.stats.snapshot();
        tracing::info!(
            "Relay stopped after {} connections",
            snapshot.connections_accepted
        );
        Ok(())
    }
}

/// Relay connections from the queue until the server stops
fn worker_loop(id: usize, receiver: Receiver<TcpStream>, config: &Config, stats: &Arc<TapStats>) {
    while let Ok(client) = receiver.recv() {
        stats.connection_opened();
        match Connection::open(client, config, Arc::clone(stats)) {
            Ok(connection) => {
                if let Err(e) = connection.handle() {
                    tracing::warn!("Worker {}: connection {} ended: {}", id, connection.peer_addr(), e);
                }
            }
            Err(e) => tracing::warn!("Worker {}: {}", id, e),
        }
        stats.connection_closed();
    }
    tracing::trace!("Worker {} exiting", id);
}
