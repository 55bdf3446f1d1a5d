//! Network Module
//!
//! Observing TCP relay.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Worker thread pool fed over a channel
//! - Per connection, one framer per direction; bytes are forwarded unchanged

mod server;
mod connection;
mod stats;

pub use server::Server;
pub use connection::Connection;
pub use stats::{Direction, StatsSnapshot, TapStats};
