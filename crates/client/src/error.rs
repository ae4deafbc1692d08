//! Client-side error taxonomy.
//!
//! Transport and store errors are caught at the adapter boundary and
//! converted into safe defaults (empty room list, cached/zero balance)
//! or a rejected operation surfaced to the user. They never propagate
//! as an unhandled fault into the render loop. The only fatal-for-the-
//! feature condition is a missing realtime backend, which disables
//! multiplayer while single-player continues.

use thiserror::Error;

/// Errors from the room transport layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The realtime SDK/backend is entirely absent. Fatal for the
    /// multiplayer feature, non-fatal for the app.
    #[error("realtime backend unavailable: {0}")]
    Unavailable(String),

    /// `initialize` has not been called (or failed).
    #[error("transport not initialized")]
    NotInitialized,

    /// The network call was rejected. Recoverable and retryable.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Neither a room id nor a room name was supplied.
    #[error("a room id or room name is required")]
    MissingRoomIdentifier,
}

impl TransportError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    /// Whether the caller may retry the same operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_))
    }
}

/// Errors from the remote record store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Fetch/write failed. Recoverable via the local cache plus the
    /// pending-sync flag.
    #[error("record store unreachable: {0}")]
    Unreachable(String),

    /// `create` was called for an identity that already has a record.
    #[error("record already exists for {0}")]
    AlreadyExists(String),

    /// The store returned a payload we could not decode.
    #[error("malformed record payload: {0}")]
    Payload(String),
}

impl StoreError {
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    pub fn payload(msg: impl Into<String>) -> Self {
        Self::Payload(msg.into())
    }
}
