use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error("Library backend error: {0}")]
    Bridge(#[from] BridgeError),

    /// The last reload failed; the cache refuses to serve stale data.
    #[error("Track cache unavailable after failed reload: {0}")]
    CacheFailed(BridgeError),
}

impl LibraryError {
    pub fn is_transient(&self) -> bool {
        match self {
            LibraryError::Bridge(err) | LibraryError::CacheFailed(err) => err.is_transient(),
        }
    }
}

impl From<LibraryError> for BridgeError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::Bridge(err) | LibraryError::CacheFailed(err) => err,
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
