//! Configuration for resptap
//!
//! Centralized configuration with sensible defaults.

use crate::error::{Result, TapError};

/// Main configuration for a relay instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address for clients
    pub listen_addr: String,

    /// Address of the real server traffic is relayed to
    pub upstream_addr: String,

    /// Number of worker threads (one connection per worker at a time)
    pub workers: usize,

    /// Connection read timeout (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,

    /// Size of the per-direction read buffer (bytes)
    pub buffer_size: usize,

    // -------------------------------------------------------------------------
    // Framer Configuration
    // -------------------------------------------------------------------------
    /// Limits applied to every framer the relay creates
    pub frame_limits: FrameLimits,
}

/// Resource limits for a single framer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    /// Max bytes held while waiting for a message to complete
    pub max_pending_bytes: usize,

    /// Max array nesting depth (top-level array is depth 1)
    pub max_nesting_depth: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_pending_bytes: 512 * 1024 * 1024, // 512 MB, the server's own bulk limit
            max_nesting_depth: 128,
        }
    }
}

impl FrameLimits {
    pub fn validate(&self) -> Result<()> {
        if self.max_pending_bytes == 0 {
            return Err(TapError::Config("max_pending_bytes must be > 0".to_string()));
        }
        if self.max_nesting_depth == 0 {
            return Err(TapError::Config("max_nesting_depth must be > 0".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:6378".to_string(),
            upstream_addr: "127.0.0.1:6379".to_string(),
            workers: 64,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            buffer_size: 16 * 1024,
            frame_limits: FrameLimits::default(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the config for values the relay cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(TapError::Config("listen address is empty".to_string()));
        }
        if self.upstream_addr.trim().is_empty() {
            return Err(TapError::Config("upstream address is empty".to_string()));
        }
        if self.workers == 0 {
            return Err(TapError::Config("workers must be > 0".to_string()));
        }
        if self.buffer_size == 0 {
            return Err(TapError::Config("buffer_size must be > 0".to_string()));
        }
        self.frame_limits.validate()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the upstream server address
    pub fn upstream_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.upstream_addr = addr.into();
        self
    }

    /// Set the number of worker threads
    pub fn workers(mut self, count: usize) -> Self {
        self.config.workers = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the per-direction read buffer size (in bytes)
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// Set the maximum pending bytes per framer
    pub fn max_pending_bytes(mut self, size: usize) -> Self {
        self.config.frame_limits.max_pending_bytes = size;
        self
    }

    /// Set the maximum array nesting depth
    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.config.frame_limits.max_nesting_depth = depth;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
