//! # Queue Error Types
//!
//! Errors raised by the filter store and AutoQueue sessions.

use bridge_traits::error::BridgeError;
use core_playback::PlaybackError;
use thiserror::Error;

/// Errors that can occur while managing filters or running a session.
///
/// Cloneable so every waiter on [`AutoQueueSession::done`](crate::AutoQueueSession::done)
/// sees the same value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Filter not found: {0}")]
    FilterNotFound(String),

    #[error("Invalid filter name '{0}': must be non-empty and must not contain '/'")]
    InvalidFilterName(String),

    /// A player or playlist call failed.
    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// The player's library could not be read.
    #[error("Library error: {0}")]
    Library(#[from] BridgeError),

    /// The session task went away without reporting an outcome.
    #[error("Session task ended unexpectedly: {0}")]
    TaskLost(String),
}

impl QueueError {
    /// Returns `true` if the same operation may succeed later.
    pub fn is_transient(&self) -> bool {
        match self {
            QueueError::Playback(err) => err.is_transient(),
            QueueError::Library(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
