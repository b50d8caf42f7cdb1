//! Error types for the CommServer simulator.

use std::io;
use thiserror::Error;

/// Result type alias for simulator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for simulator operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during network or file access.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A log line is missing one of the required markers.
    #[error("malformed log line: missing '{marker}'")]
    MalformedLine { marker: &'static str },

    /// A log line field did not parse as a decimal integer.
    #[error("malformed log line: bad value for '{marker}'")]
    MalformedField { marker: &'static str },

    /// Protobuf text-format payload could not be parsed.
    #[error("bad payload: {message}")]
    BadPayload { message: String },

    /// Wire frame violates the protocol: bad length, checksum, version or padding.
    #[error("bad frame: {message}")]
    BadFrame { message: String },

    /// The inbound echo queue is saturated.
    #[error("inbound queue full")]
    QueueFull,

    /// Connect/TLS/read/write failure on a peer connection.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Redis protocol or server error.
    #[error("redis error: {message}")]
    Redis { message: String },

    /// Inconsistent or invalid configuration.
    #[error("config error: {message}")]
    Config { message: String },

    /// Peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,
}

impl Error {
    /// Create a bad-frame error.
    pub fn bad_frame(message: impl Into<String>) -> Self {
        Self::BadFrame {
            message: message.into(),
        }
    }

    /// Create a bad-payload error.
    pub fn bad_payload(message: impl Into<String>) -> Self {
        Self::BadPayload {
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a redis error.
    pub fn redis(message: impl Into<String>) -> Self {
        Self::Redis {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
