//! # Playback Module
//!
//! Player capability, playlist reconciliation and the player registry.
//!
//! ## Overview
//!
//! This module handles:
//! - The [`Player`] contract backend adapters implement
//! - [`MetaPlaylist`], which keeps per-slot metadata over a bare backend playlist
//! - [`PlayerList`], the named set of players
//! - [`MemoryPlayer`](memory::MemoryPlayer), a synthetic backend

pub mod error;
pub mod memory;
pub mod player;
pub mod playlist;
pub mod registry;

pub use error::{PlaybackError, Result};
pub use player::{clamp_volume, Player, PlayerStatus};
pub use playlist::{MetaPlaylist, MetaTrack, QueuedBy, TrackMeta};
pub use registry::PlayerList;
