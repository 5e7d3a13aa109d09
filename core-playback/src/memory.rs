//! Synthetic in-memory player backend.
//!
//! [`MemoryPlayer`] keeps all playback state in process and honours the
//! full [`Player`] contract. It backs stream-only players and doubles as the
//! reference backend in tests. [`MemoryPlaylist`] is its bare playlist; a
//! handle to it can be used to change the playlist behind the engine's back,
//! the way a native client of a real server would.

use crate::error::Result;
use crate::player::{clamp_volume, Player};
use crate::playlist::MetaPlaylist;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::library::{Library, Track};
use bridge_traits::playback::{BackendPlaylist, PlayState};
use core_runtime::config::EventBusConfig;
use core_runtime::events::{EventBus, PlayerEvent};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
struct MemoryState {
    tracks: Vec<Track>,
    index: Option<usize>,
    state: PlayState,
    time: Duration,
    volume: u8,
    available: bool,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            index: None,
            state: PlayState::Stopped,
            time: Duration::ZERO,
            volume: 50,
            available: true,
        }
    }
}

impl MemoryState {
    fn stop(&mut self, events: &mut Vec<PlayerEvent>) {
        self.time = Duration::ZERO;
        if self.state != PlayState::Stopped {
            self.state = PlayState::Stopped;
            events.push(PlayerEvent::PlayStateChanged {
                state: PlayState::Stopped,
            });
        }
    }
}

struct MemoryBackend {
    state: Mutex<MemoryState>,
    events: EventBus<PlayerEvent>,
}

impl MemoryBackend {
    /// Run `change` against the state and emit the events it produced once
    /// the lock is released.
    fn update<T>(
        &self,
        change: impl FnOnce(&mut MemoryState, &mut Vec<PlayerEvent>) -> BridgeResult<T>,
    ) -> BridgeResult<T> {
        let mut events = Vec::new();
        let result = {
            let mut state = self.state.lock();
            if !state.available {
                return Err(BridgeError::Unavailable(
                    "memory player is offline".to_string(),
                ));
            }
            change(&mut state, &mut events)?
        };
        for event in events {
            self.events.emit(event);
        }
        Ok(result)
    }

    fn read<T>(&self, read: impl FnOnce(&MemoryState) -> T) -> BridgeResult<T> {
        self.update(|state, _| Ok(read(state)))
    }
}

// ============================================================================
// MemoryPlaylist
// ============================================================================

/// Bare playlist of a [`MemoryPlayer`].
#[derive(Clone)]
pub struct MemoryPlaylist {
    backend: Arc<MemoryBackend>,
}

#[async_trait::async_trait]
impl BackendPlaylist for MemoryPlaylist {
    async fn insert(&self, pos: Option<usize>, tracks: &[Track]) -> BridgeResult<()> {
        self.backend.update(|state, events| {
            let len = state.tracks.len();
            let at = pos.unwrap_or(len);
            if at > len {
                return Err(BridgeError::InvalidArgument(format!(
                    "insert position {} beyond playlist of {}",
                    at, len
                )));
            }
            state.tracks.splice(at..at, tracks.iter().cloned());
            if let Some(current) = state.index {
                if at <= current {
                    state.index = Some(current + tracks.len());
                }
            }
            events.push(PlayerEvent::PlaylistChanged { index: state.index });
            Ok(())
        })
    }

    async fn move_track(&self, from: usize, to: usize) -> BridgeResult<()> {
        self.backend.update(|state, events| {
            let len = state.tracks.len();
            if from >= len || to >= len {
                return Err(BridgeError::InvalidArgument(format!(
                    "cannot move {} to {} in playlist of {}",
                    from, to, len
                )));
            }
            let track = state.tracks.remove(from);
            state.tracks.insert(to, track);
            state.index = state.index.map(|current| {
                if current == from {
                    to
                } else if from < current && to >= current {
                    current - 1
                } else if from > current && to <= current {
                    current + 1
                } else {
                    current
                }
            });
            events.push(PlayerEvent::PlaylistChanged { index: state.index });
            Ok(())
        })
    }

    async fn remove(&self, positions: &[usize]) -> BridgeResult<()> {
        self.backend.update(|state, events| {
            let len = state.tracks.len();
            if let Some(&bad) = positions.iter().find(|&&p| p >= len) {
                return Err(BridgeError::InvalidArgument(format!(
                    "cannot remove {} from playlist of {}",
                    bad, len
                )));
            }
            for &position in positions.iter().rev() {
                state.tracks.remove(position);
            }
            if let Some(current) = state.index {
                let before = positions.iter().filter(|&&p| p < current).count();
                let shifted = current - before;
                if shifted >= state.tracks.len() {
                    state.index = None;
                    state.stop(events);
                } else {
                    state.index = Some(shifted);
                }
            }
            events.push(PlayerEvent::PlaylistChanged { index: state.index });
            Ok(())
        })
    }

    async fn tracks(&self) -> BridgeResult<Vec<Track>> {
        self.backend.read(|state| state.tracks.clone())
    }

    async fn len(&self) -> BridgeResult<usize> {
        self.backend.read(|state| state.tracks.len())
    }
}

impl fmt::Debug for MemoryPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPlaylist")
            .field("len", &self.backend.state.lock().tracks.len())
            .finish()
    }
}

// ============================================================================
// MemoryPlayer
// ============================================================================

/// Player whose backend lives entirely in memory.
pub struct MemoryPlayer {
    backend: Arc<MemoryBackend>,
    playlist: MetaPlaylist,
    library: Arc<dyn Library>,
}

impl MemoryPlayer {
    pub fn new(library: Arc<dyn Library>) -> Self {
        Self::with_config(library, EventBusConfig::default())
    }

    pub fn with_config(library: Arc<dyn Library>, config: EventBusConfig) -> Self {
        Self::with_playlist_layer(library, config, |bare| bare)
    }

    /// Build a player whose reconciled playlist talks to `layer(bare)`
    /// instead of the bare playlist, e.g. to record or delay backend calls.
    pub fn with_playlist_layer<F>(library: Arc<dyn Library>, config: EventBusConfig, layer: F) -> Self
    where
        F: FnOnce(Arc<dyn BackendPlaylist>) -> Arc<dyn BackendPlaylist>,
    {
        let backend = Arc::new(MemoryBackend {
            state: Mutex::new(MemoryState::default()),
            events: EventBus::with_config(config),
        });
        let bare: Arc<dyn BackendPlaylist> = Arc::new(MemoryPlaylist {
            backend: Arc::clone(&backend),
        });
        Self {
            playlist: MetaPlaylist::new(layer(bare)),
            backend,
            library,
        }
    }

    /// Direct handle to the bare playlist, bypassing metadata tracking.
    pub fn bare_playlist(&self) -> MemoryPlaylist {
        MemoryPlaylist {
            backend: Arc::clone(&self.backend),
        }
    }

    /// Take the backend offline or bring it back.
    ///
    /// While offline every backend call fails with
    /// [`BridgeError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        let changed = {
            let mut state = self.backend.state.lock();
            let changed = state.available != available;
            state.available = available;
            changed
        };
        if changed {
            debug!(available, "Memory player availability changed");
            self.backend
                .events
                .emit(PlayerEvent::AvailabilityChanged { available });
        }
    }

    /// Finish the current track the way playback reaching its end would:
    /// move on to the next track, or stop with no current track after the
    /// last one.
    pub fn finish_track(&self) -> Result<()> {
        self.backend.update(|state, events| {
            if state.state == PlayState::Stopped {
                return Ok(());
            }
            state.time = Duration::ZERO;
            match state.index {
                Some(current) if current + 1 < state.tracks.len() => {
                    state.index = Some(current + 1);
                }
                _ => {
                    state.index = None;
                    state.stop(events);
                }
            }
            events.push(PlayerEvent::PlaylistChanged { index: state.index });
            Ok(())
        })?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Player for MemoryPlayer {
    async fn time(&self) -> Result<Duration> {
        Ok(self.backend.read(|state| state.time)?)
    }

    async fn set_time(&self, offset: Duration) -> Result<()> {
        self.backend.update(|state, events| {
            if state.state != PlayState::Stopped {
                state.time = offset;
                events.push(PlayerEvent::TimeChanged { offset });
            }
            Ok(())
        })?;
        Ok(())
    }

    async fn track_index(&self) -> Result<Option<usize>> {
        Ok(self.backend.read(|state| state.index)?)
    }

    async fn set_track_index(&self, index: usize) -> Result<()> {
        self.backend.update(|state, events| {
            state.time = Duration::ZERO;
            if index >= state.tracks.len() {
                state.index = None;
                state.stop(events);
            } else {
                state.index = Some(index);
            }
            events.push(PlayerEvent::PlaylistChanged { index: state.index });
            Ok(())
        })?;
        Ok(())
    }

    async fn state(&self) -> Result<PlayState> {
        Ok(self.backend.read(|state| state.state)?)
    }

    async fn set_state(&self, requested: PlayState) -> Result<()> {
        self.backend.update(|state, events| {
            match requested {
                // Reports the transition itself, and only when there is one.
                PlayState::Stopped => state.stop(events),
                PlayState::Playing | PlayState::Paused => {
                    if !state.tracks.is_empty() {
                        if state.index.is_none() {
                            state.index = Some(0);
                            events.push(PlayerEvent::PlaylistChanged { index: state.index });
                        }
                        state.state = requested;
                    }
                    events.push(PlayerEvent::PlayStateChanged { state: state.state });
                }
            }
            Ok(())
        })?;
        Ok(())
    }

    async fn volume(&self) -> Result<u8> {
        Ok(self.backend.read(|state| state.volume)?)
    }

    async fn set_volume(&self, volume: i32) -> Result<()> {
        let level = clamp_volume(volume);
        self.backend.update(|state, events| {
            state.volume = level;
            events.push(PlayerEvent::VolumeChanged { level });
            Ok(())
        })?;
        Ok(())
    }

    fn playlist(&self) -> &MetaPlaylist {
        &self.playlist
    }

    fn library(&self) -> Arc<dyn Library> {
        Arc::clone(&self.library)
    }

    fn events(&self) -> &EventBus<PlayerEvent> {
        &self.backend.events
    }

    async fn available(&self) -> bool {
        self.backend.state.lock().available
    }
}

impl fmt::Debug for MemoryPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPlayer")
            .field("state", &*self.backend.state.lock())
            .finish()
    }
}
