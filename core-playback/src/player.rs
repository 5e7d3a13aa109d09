//! # Player Capability
//!
//! The contract every backend adapter implements. The rest of the core
//! reads and changes playback state only through [`Player`].
//!
//! ## Backend Variants
//!
//! - Remote media servers (MPD-like, SlimServer-like) wrapped by an adapter
//!   that speaks their protocol
//! - Synthetic players such as [`MemoryPlayer`](crate::memory::MemoryPlayer)
//!
//! ## Contract
//!
//! Adapters must honour these rules, which callers rely on:
//!
//! - `set_time` on a stopped player does nothing and succeeds.
//! - `set_track_index(i)` with `i >= len` stops the player instead of failing.
//! - `set_state(Playing)` on an empty playlist succeeds and emits a state
//!   event without starting playback.
//! - `set_volume` clamps to `0..=100` silently (see [`clamp_volume`]).
//! - `available` never fails; `false` is advisory.
//!
//! Calls that reach the backend may fail with
//! [`BridgeError::Unavailable`](bridge_traits::BridgeError::Unavailable);
//! adapters reconnect on their own and the core reports each failure once.

use crate::error::Result;
use crate::playlist::MetaPlaylist;
use bridge_traits::library::Library;
use bridge_traits::playback::PlayState;
use core_runtime::events::{EventBus, PlayerEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Highest accepted volume.
pub const MAX_VOLUME: u8 = 100;

/// Clamp a requested volume into `0..=MAX_VOLUME`.
pub fn clamp_volume(volume: i32) -> u8 {
    volume.clamp(0, i32::from(MAX_VOLUME)) as u8
}

/// Point-in-time view of a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    /// `None` when no track is selected.
    pub track_index: Option<usize>,
    pub time: Duration,
    pub state: PlayState,
    pub volume: u8,
}

impl PlayerStatus {
    /// A player is idle when it is stopped or has no current track.
    pub fn is_idle(&self) -> bool {
        self.state == PlayState::Stopped || self.track_index.is_none()
    }
}

/// A controllable media player backend.
#[async_trait::async_trait]
pub trait Player: Send + Sync {
    /// Offset into the current track.
    async fn time(&self) -> Result<Duration>;

    /// Seek within the current track. No-op while stopped.
    async fn set_time(&self, offset: Duration) -> Result<()>;

    /// Index of the current track, `None` when there is none.
    async fn track_index(&self) -> Result<Option<usize>>;

    /// Select a track. Indices past the end stop the player.
    async fn set_track_index(&self, index: usize) -> Result<()>;

    async fn state(&self) -> Result<PlayState>;

    async fn set_state(&self, state: PlayState) -> Result<()>;

    /// Volume in `0..=100`.
    async fn volume(&self) -> Result<u8>;

    /// Out-of-range values are clamped.
    async fn set_volume(&self, volume: i32) -> Result<()>;

    /// The reconciled playlist. Always the same instance for a player.
    fn playlist(&self) -> &MetaPlaylist;

    /// The player's track catalogue.
    fn library(&self) -> Arc<dyn Library>;

    /// Notifications about this player's state.
    fn events(&self) -> &EventBus<PlayerEvent>;

    /// Advisory liveness probe.
    async fn available(&self) -> bool;

    /// Read index, time, state and volume.
    ///
    /// The fields come from separate backend calls and are not guaranteed to
    /// describe a single instant.
    async fn status(&self) -> Result<PlayerStatus> {
        Ok(PlayerStatus {
            track_index: self.track_index().await?,
            time: self.time().await?,
            state: self.state().await?,
            volume: self.volume().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_volume() {
        assert_eq!(clamp_volume(-20), 0);
        assert_eq!(clamp_volume(0), 0);
        assert_eq!(clamp_volume(55), 55);
        assert_eq!(clamp_volume(100), 100);
        assert_eq!(clamp_volume(1000), 100);
    }

    #[test]
    fn test_idle_status() {
        let mut status = PlayerStatus {
            track_index: Some(2),
            time: Duration::ZERO,
            state: PlayState::Playing,
            volume: 50,
        };
        assert!(!status.is_idle());

        status.track_index = None;
        assert!(status.is_idle());

        status.track_index = Some(2);
        status.state = PlayState::Stopped;
        assert!(status.is_idle());

        status.state = PlayState::Paused;
        assert!(!status.is_idle());
    }
}
