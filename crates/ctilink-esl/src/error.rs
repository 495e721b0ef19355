//! Error types for the event socket client.

use std::error::Error as StdError;
use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Transport-level failures on the switch connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Resolving the switch host failed.
    #[error("failed to resolve switch address {host}:{port}: {source}")]
    Resolve {
        /// Host that failed to resolve.
        host: String,
        /// Port requested.
        port: u16,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },

    /// The host resolved to no usable address.
    #[error("no addresses resolved for {host}:{port}")]
    ResolveEmpty {
        /// Host that resolved to nothing.
        host: String,
        /// Port requested.
        port: u16,
    },

    /// The TCP connect was refused or timed out.
    #[error("failed to connect to switch at {addr}: {source}")]
    Connect {
        /// Address the connect was attempted against.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// I/O error while reading or writing.
    #[error("I/O error on switch connection: {0}")]
    Io(#[from] io::Error),
}

/// A header block declared a body the client will not read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The declared inner body length did not parse.
    #[error("invalid body length '{value}'")]
    InvalidBodyLength {
        /// The raw header value.
        value: String,
    },

    /// The declared inner body length exceeds the accepted ceiling.
    #[error("body length {length} exceeds the {limit} byte limit")]
    BodyTooLarge {
        /// Declared length.
        length: usize,
        /// Largest accepted length.
        limit: usize,
    },
}

/// Failure reported by a collaborator (command store or registry).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl StoreError {
    /// Creates an error carrying only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors that end a client run loop.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The switch connection failed.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// A collaborator call failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The worker thread could not be spawned.
    #[error("failed to spawn client thread: {source}")]
    Spawn {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// `join` was called on a client that was never started.
    #[error("client was not started")]
    NotStarted,

    /// The worker thread panicked.
    #[error("client thread panicked")]
    ThreadPanic,
}
