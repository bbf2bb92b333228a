//! Error types for the feed engine

use feed_core::{CoreError, Id};
use thiserror::Error;

/// Result type for feed engine operations
pub type Result<T> = std::result::Result<T, FeedError>;

/// Terminal failure of a primary-list fetch cycle (or of construction).
///
/// Cycle errors are never retried; the caller re-triggers by changing the
/// filter again.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Transport failure (connect, reset, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Success status but the body is not a JSON array of records
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Network(err.to_string())
    }
}

impl From<CoreError> for FeedError {
    fn from(err: CoreError) -> Self {
        FeedError::Config(err.to_string())
    }
}

/// Why a single sponsor could not be resolved this round.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntityFailure {
    #[error("network: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("malformed body: {0}")]
    Malformed(String),

    /// Batch answer did not include the id
    #[error("absent from batch response")]
    Absent,

    /// The source has no batch endpoint
    #[error("batch retrieval not supported")]
    Unsupported,
}

/// A single sponsor fetch failed. Non-fatal: the id stays missing and is
/// retried on the next `ensure` that asks for it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Sponsor {id} unresolved: {reason}")]
pub struct PartialEntityError {
    pub id: Id,
    pub reason: EntityFailure,
}

impl PartialEntityError {
    pub fn new(id: Id, reason: EntityFailure) -> Self {
        Self { id, reason }
    }
}
