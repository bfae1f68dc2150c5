//! ============================================================================
//! Error Taxonomy for Gatewarden
//! ============================================================================
//! Every operation is attempt-once: there is no retry policy anywhere in the
//! core. Validation failures are terminal for the triggering request and are
//! surfaced as user-facing rejection reasons; delivery failures are caught at
//! the notification site, logged, and never unwind a prior mutation.
//! ============================================================================

use thiserror::Error;

/// Errors produced by the gate access core.
#[derive(Debug, Error)]
pub enum GateError {
    /// Identity or record absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate registration attempt.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Blocked, expired, or otherwise unusable state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Caller is not a configured administrator.
    #[error("administrator access required")]
    Unauthorized,

    /// Notification could not reach a channel. Non-fatal by policy:
    /// callers log this and carry on.
    #[error("message delivery failed: {0}")]
    Delivery(String),

    /// Credential image encoding failed. Fatal to the single operation,
    /// never retried.
    #[error("credential encoding failed: {0}")]
    Encoder(String),

    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Underlying redb storage failure.
    #[error("storage error")]
    Store(#[source] redb::Error),

    /// Record (de)serialization failure.
    #[error("record codec error")]
    Codec(#[source] bincode::Error),
}

impl From<redb::DatabaseError> for GateError {
    fn from(error: redb::DatabaseError) -> Self {
        Self::Store(error.into())
    }
}

impl From<redb::TransactionError> for GateError {
    fn from(error: redb::TransactionError) -> Self {
        Self::Store(error.into())
    }
}

impl From<redb::TableError> for GateError {
    fn from(error: redb::TableError) -> Self {
        Self::Store(error.into())
    }
}

impl From<redb::StorageError> for GateError {
    fn from(error: redb::StorageError) -> Self {
        Self::Store(error.into())
    }
}

impl From<redb::CommitError> for GateError {
    fn from(error: redb::CommitError) -> Self {
        Self::Store(error.into())
    }
}

impl From<bincode::Error> for GateError {
    fn from(error: bincode::Error) -> Self {
        Self::Codec(error)
    }
}

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, GateError>;
