use thiserror::Error;

/// Errors raised by collaborator implementations (backend adapters,
/// libraries, filters).
///
/// The type is `Clone` so a single failure can be handed to several waiters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend operation failed: {0}")]
    OperationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl BridgeError {
    /// Returns true when the failure is expected to clear up on its own,
    /// typically after the adapter reconnects.
    pub fn is_transient(&self) -> bool {
        matches!(self, BridgeError::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
