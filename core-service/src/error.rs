use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Jukebox initialization failed: {0}")]
    InitializationFailed(String),

    /// A relative or absolute index resolved to a negative slot.
    #[error("Invalid track index: {0}")]
    InvalidTrackIndex(i64),

    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Backend error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("AutoQueue error: {0}")]
    Queue(#[from] core_queue::QueueError),
}

impl ServiceError {
    /// Returns `true` if retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Bridge(err) => err.is_transient(),
            ServiceError::Library(err) => err.is_transient(),
            ServiceError::Playback(err) => err.is_transient(),
            ServiceError::Queue(err) => err.is_transient(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
