//! Error types and result handling for binlog-relay.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! Most errors never leave the component that produced them: the checkpoint
//! store, the enqueue path and the delivery worker log and swallow transient
//! failures. Only configuration errors and a failed log source reach `main`.
//!
//! # Example
//!
//! ```rust
//! use binlog_relay::{Error, Result};
//!
//! fn lookup_group() -> Result<String> {
//!     Err(Error::Routing("table listed twice".to_string()))
//! }
//!
//! match lookup_group() {
//!     Ok(group) => println!("Group: {}", group),
//!     Err(Error::Routing(msg)) => eprintln!("Routing error: {}", msg),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use thiserror::Error;

/// The main error type for binlog-relay operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error from the config file or environment.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Invalid or inconsistent routing table.
    #[error("Routing error: {0}")]
    Routing(String),

    /// Redis client or command error (fast checkpoint tier, delivery queue).
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// HTTP client error while delivering a change record.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The delivery sink answered with a non-success status.
    #[error("Delivery to {url} rejected with status {status}")]
    Rejected {
        /// Target URL of the delivery
        url: String,
        /// HTTP status code returned by the sink
        status: u16,
    },

    /// JSON serialization error when encoding records or positions.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error, typically from checkpoint file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A backing store could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),
}

/// A convenient Result type alias for binlog-relay operations.
pub type Result<T> = std::result::Result<T, Error>;
