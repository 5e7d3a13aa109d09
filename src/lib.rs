//! Workspace umbrella crate.
//!
//! Re-exports the jukebox facade together with the lower layers that host
//! applications usually need to wire a backend in. Optional layers sit behind
//! features so a host can depend on `jukebox-workspace` alone.

pub use core_service::*;

#[cfg(feature = "autoqueue")]
pub use core_queue as queue;

#[cfg(feature = "memory-backend")]
pub use core_playback::memory;

#[cfg(feature = "library-cache")]
pub use core_library::cache;
