//! # Collaborator Contracts
//!
//! Traits and value types shared between the jukebox core and the things it
//! talks to but does not implement.
//!
//! ## Overview
//!
//! - [`Library`](library::Library) - track catalogue (`tracks`, `track_info`, `art`)
//! - [`BackendPlaylist`](playback::BackendPlaylist) - bare playlist kept by a media server
//! - [`Filter`](filter::Filter) - track predicate used for search and auto-queueing
//!
//! Backend adapters (MPD-like, SlimServer-like, synthetic) implement these and
//! the `Player` capability from `core-playback`.
//!
//! ## Error Handling
//!
//! Every contract returns [`BridgeError`](error::BridgeError). Adapters should
//! map connection loss to [`BridgeError::Unavailable`] so the core can tell
//! transient failures apart from rejected operations.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`; the core shares implementations across
//! tasks behind `Arc`.

pub mod error;
pub mod filter;
pub mod library;
pub mod playback;

pub use error::BridgeError;

pub use filter::{Filter, FilterKind, MatchInfo, MatchSpan};
pub use library::{Art, Library, Track};
pub use playback::{BackendPlaylist, PlayState};
