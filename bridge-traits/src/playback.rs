//! Backend playback contracts.
//!
//! Adapters for concrete media servers implement [`BackendPlaylist`] for the
//! bare track list they manage. Anything the server cannot store (such as who
//! queued a track) is layered on by the core.

use crate::{error::Result, library::Track};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transport state of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayState::Playing => "playing",
            PlayState::Paused => "paused",
            PlayState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

impl FromStr for PlayState {
    type Err = crate::error::BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "playing" => Ok(PlayState::Playing),
            "paused" => Ok(PlayState::Paused),
            "stopped" => Ok(PlayState::Stopped),
            other => Err(crate::error::BridgeError::InvalidArgument(format!(
                "unknown play state: {other}"
            ))),
        }
    }
}

/// Bare playlist as stored by a backend.
///
/// Positions are zero based. `insert` with `None` appends. `move_track`
/// leaves the moved track at index `to`. `remove` receives positions sorted
/// in ascending order without duplicates.
#[async_trait::async_trait]
pub trait BackendPlaylist: Send + Sync {
    async fn insert(&self, pos: Option<usize>, tracks: &[Track]) -> Result<()>;

    async fn move_track(&self, from: usize, to: usize) -> Result<()>;

    async fn remove(&self, positions: &[usize]) -> Result<()>;

    async fn tracks(&self) -> Result<Vec<Track>>;

    async fn len(&self) -> Result<usize> {
        Ok(self.tracks().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_state_round_trips_through_text() {
        for state in [PlayState::Playing, PlayState::Paused, PlayState::Stopped] {
            assert_eq!(state.to_string().parse::<PlayState>().unwrap(), state);
        }
        assert!("rewinding".parse::<PlayState>().is_err());
    }

    #[test]
    fn test_play_state_serde_is_lowercase() {
        let json = serde_json::to_string(&PlayState::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
    }
}
