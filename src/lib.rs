//! # resptap
//!
//! Incremental framing for the key-value store wire protocol:
//! - Chunk-agnostic splitting of a byte stream into complete messages
//! - Explicit errors for malformed input instead of stalling
//! - Bounded buffering and nesting
//! - An observing TCP relay and an offline capture splitter on top
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────┐   raw bytes    ┌─────────────────┐   raw bytes    ┌──────────┐
//! │  Client  │ ─────────────► │      Relay      │ ─────────────► │ Upstream │
//! │          │ ◄───────────── │ (one framer per │ ◄───────────── │  Server  │
//! └──────────┘                │    direction)   │                └──────────┘
//!                             └────────┬────────┘
//!                                      │ messages
//!                                      ▼
//!                             ┌─────────────────┐
//!                             │  Logging/Stats  │
//!                             └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod capture;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FrameError, Result, TapError};
pub use config::{Config, FrameLimits};
pub use protocol::{Framer, Message, MessageKind};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of resptap
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
