//! # Playback Error Types
//!
//! Errors raised by players, the playlist reconciliation engine and the
//! player registry.

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors that can occur during player and playlist operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// The backend rejected the call or could not be reached.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    // ========================================================================
    // Playlist Errors
    // ========================================================================
    /// `insert` was given a different number of tracks and metadata entries.
    #[error("Got {tracks} tracks but {metas} metadata entries")]
    MetadataLengthMismatch { tracks: usize, metas: usize },

    /// A position does not address a slot of the current playlist.
    #[error("Position {position} is out of range for a playlist of {len} tracks")]
    PositionOutOfRange { position: usize, len: usize },

    /// Backend data contradicts what the engine knows about the playlist.
    /// Not retryable.
    #[error("Playlist reconciliation invariant violated: {0}")]
    ReconciliationInvariantViolation(String),

    // ========================================================================
    // Registry Errors
    // ========================================================================
    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Invalid player name '{0}': only letters, digits and '_' are allowed")]
    InvalidPlayerName(String),

    #[error("Player already registered: {0}")]
    DuplicatePlayer(String),
}

impl PlaybackError {
    /// Returns `true` if retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, PlaybackError::Bridge(err) if err.is_transient())
    }

    /// Returns `true` if the backend could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PlaybackError::Bridge(BridgeError::Unavailable(_)))
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
