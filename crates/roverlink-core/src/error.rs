//! Error types for NTRIP client operations.
//!
//! All failures are communicated through return values; nothing in the
//! client panics on a protocol or transport fault. Every error maps onto
//! the persisted [`DetailedError`] code via [`ClientError::detailed`].

use crate::types::DetailedError;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors returned by the NTRIP client API.
#[derive(Error, Debug)]
pub enum ClientError {
    /// `init` was called before both config and credentials were set
    #[error("configuration and credentials must be set before init")]
    NotConfigured,

    /// The client lock was contended; the call can be retried as-is
    #[error("client is busy, retry the call")]
    Busy,

    /// The caster answered the handshake with a source table
    #[error("caster rejected mountpoint {mountpoint:?} with a source table")]
    InvalidMountpoint { mountpoint: String },

    /// The caster's handshake response matched neither ICY nor SOURCETABLE
    #[error("unrecognized caster response: {response:?}")]
    UnexpectedResponse { response: String },

    /// The caster closed or reset the connection
    #[error("connection reset by caster")]
    ConnectionReset,

    /// The caller's buffer cannot hold a full correction read
    #[error("caller buffer of {capacity} bytes is below the required {required}")]
    BufferTooSmall { capacity: usize, required: usize },

    /// Transport-level failure
    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),

    /// The polling task could not be spawned
    #[error("unable to spawn polling task: {reason}")]
    UnableToCreateTask { reason: String },
}

impl ClientError {
    /// The persisted cause code corresponding to this error.
    pub fn detailed(&self) -> DetailedError {
        match self {
            ClientError::NotConfigured => DetailedError::Unknown,
            ClientError::Busy => DetailedError::Busy,
            ClientError::InvalidMountpoint { .. } => DetailedError::InvalidMountpoint,
            ClientError::UnexpectedResponse { .. } => DetailedError::Unknown,
            ClientError::ConnectionReset => DetailedError::ConnectionReset,
            ClientError::BufferTooSmall { .. } => DetailedError::BufferTooSmall,
            ClientError::Socket(_) => DetailedError::SocketError,
            ClientError::UnableToCreateTask { .. } => DetailedError::UnableToCreateTask,
        }
    }
}
