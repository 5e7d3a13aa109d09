//! The [`Jukebox`] facade.
//!
//! One object that owns the player list, the filter store and the running
//! AutoQueue sessions, and exposes every operation a host surface needs by
//! player name.

use crate::error::{Result, ServiceError};
use crate::JukeboxDependencies;
use bridge_traits::error::BridgeError;
use bridge_traits::{Art, Filter, Library, PlayState};
use core_library::{all_track_info, filter_tracks, rank_by_matches, SearchResult};
use core_playback::{MetaTrack, Player, PlayerList, PlayerStatus};
use core_queue::{AutoQueue, AutoQueueSession, FilterStore};
use core_runtime::config::CoreConfig;
use core_runtime::EventBus;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

/// Where [`Jukebox::insert`] puts new tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertAt {
    /// Right after the current track, or at the end when nothing is current.
    Next,
    End,
    Index(usize),
}

/// Notifications about jukebox-level state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JukeboxEvent {
    /// A player's AutoQueue filter changed. `None` means auto-queueing is off.
    AutoQueuerChanged {
        player: String,
        filter: Option<String>,
    },
}

struct Inner {
    players: PlayerList,
    filters: Arc<FilterStore>,
    extra_libraries: Vec<Arc<dyn Library>>,
    config: CoreConfig,
    sessions: Mutex<HashMap<String, AutoQueueSession>>,
    events: EventBus<JukeboxEvent>,
}

/// Primary facade exposed to host applications.
#[derive(Clone)]
pub struct Jukebox {
    inner: Arc<Inner>,
}

impl Jukebox {
    /// Build a jukebox from its dependencies.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or no player is registered.
    pub fn new(deps: JukeboxDependencies) -> Result<Self> {
        let JukeboxDependencies {
            mut players,
            filters,
            extra_libraries,
            config,
        } = deps;

        config.validate()?;
        if players.is_empty() {
            return Err(ServiceError::InitializationFailed(
                "no players registered".to_string(),
            ));
        }
        if let Some(name) = &config.default_player {
            players.set_default(name.clone());
        }

        info!(
            players = ?players.names(),
            libraries = extra_libraries.len(),
            "Jukebox initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                players,
                filters,
                extra_libraries,
                events: EventBus::with_config(config.control_event_bus()),
                config,
                sessions: Mutex::new(HashMap::new()),
            }),
        })
    }

    // ========================================================================
    // Players
    // ========================================================================

    pub fn player_names(&self) -> Vec<String> {
        self.inner.players.names()
    }

    pub fn default_player(&self) -> Option<String> {
        self.inner.players.default_name()
    }

    pub fn player(&self, name: &str) -> Result<Arc<dyn Player>> {
        Ok(self.inner.players.get(name)?)
    }

    pub async fn status(&self, name: &str) -> Result<PlayerStatus> {
        Ok(self.player(name)?.status().await?)
    }

    /// Jump to a track.
    ///
    /// With `relative` set, `index` is added to the current index (no current
    /// track counts as 0).
    #[instrument(skip(self))]
    pub async fn set_track_index(&self, name: &str, index: i64, relative: bool) -> Result<()> {
        let player = self.player(name)?;
        let target = if relative {
            let current = player.track_index().await?.unwrap_or(0);
            i64::try_from(current).unwrap_or(i64::MAX).saturating_add(index)
        } else {
            index
        };
        let target = usize::try_from(target).map_err(|_| ServiceError::InvalidTrackIndex(target))?;
        Ok(player.set_track_index(target).await?)
    }

    pub async fn set_time(&self, name: &str, offset: Duration) -> Result<()> {
        Ok(self.player(name)?.set_time(offset).await?)
    }

    pub async fn set_state(&self, name: &str, state: PlayState) -> Result<()> {
        Ok(self.player(name)?.set_state(state).await?)
    }

    pub async fn set_volume(&self, name: &str, volume: i32) -> Result<()> {
        Ok(self.player(name)?.set_volume(volume).await?)
    }

    // ========================================================================
    // Playlists
    // ========================================================================

    /// The reconciled playlist with track details looked up in every library.
    ///
    /// Slots no library knows keep the track the playlist reported.
    #[instrument(skip(self))]
    pub async fn playlist(&self, name: &str) -> Result<Vec<MetaTrack>> {
        let player = self.player(name)?;
        let mut slots = player.playlist().meta_tracks().await?;

        let uris: Vec<String> = slots.iter().map(|slot| slot.track.uri.clone()).collect();
        let libraries = self.libraries_for(player.as_ref());
        let details = all_track_info(&libraries, &uris).await?;

        for (slot, info) in slots.iter_mut().zip(details) {
            if !info.is_zero() {
                slot.track = info;
            }
        }
        Ok(slots)
    }

    /// Insert tracks with their metadata.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn insert(&self, name: &str, at: InsertAt, items: Vec<MetaTrack>) -> Result<()> {
        let player = self.player(name)?;
        let pos = match at {
            InsertAt::End => None,
            InsertAt::Index(index) => Some(index),
            InsertAt::Next => player.track_index().await?.map(|current| current + 1),
        };
        debug!(?pos, "Resolved insert position");
        Ok(player.playlist().insert_meta_tracks(pos, items).await?)
    }

    pub async fn move_track(&self, name: &str, from: usize, to: usize) -> Result<()> {
        Ok(self.player(name)?.playlist().move_track(from, to).await?)
    }

    pub async fn remove(&self, name: &str, positions: &[usize]) -> Result<()> {
        Ok(self.player(name)?.playlist().remove(positions).await?)
    }

    // ========================================================================
    // Library
    // ========================================================================

    /// Tracks in the player's library matching `filter`, best match first.
    #[instrument(skip(self, filter))]
    pub async fn search_tracks(&self, name: &str, filter: &dyn Filter) -> Result<Vec<SearchResult>> {
        let tracks = self.player(name)?.library().tracks().await?;
        let mut results = filter_tracks(filter, &tracks);
        rank_by_matches(&mut results);
        debug!(matches = results.len(), library = tracks.len(), "Search finished");
        Ok(results)
    }

    /// Same as [`search_tracks`](Self::search_tracks) with a stored filter.
    pub async fn search_with_filter(&self, name: &str, filter_name: &str) -> Result<Vec<SearchResult>> {
        let filter = self.inner.filters.get(filter_name)?;
        self.search_tracks(name, filter.as_ref()).await
    }

    /// Album art for `uri`, from the first library that has it.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotFound`] when no library has art for `uri`. If a
    /// library failed some other way and none had art, that failure is
    /// returned instead.
    #[instrument(skip(self))]
    pub async fn track_art(&self, name: &str, uri: &str) -> Result<Art> {
        let player = self.player(name)?;
        let mut failure = None;
        for library in self.libraries_for(player.as_ref()) {
            match library.art(uri).await {
                Ok(art) => return Ok(art),
                Err(BridgeError::NotFound(_)) => {}
                Err(err) => {
                    warn!(error = %err, "Library failed to load art");
                    failure = Some(err);
                }
            }
        }
        Err(failure
            .unwrap_or_else(|| BridgeError::NotFound(format!("no art for {}", uri)))
            .into())
    }

    fn libraries_for(&self, player: &dyn Player) -> Vec<Arc<dyn Library>> {
        let mut libraries = self.inner.extra_libraries.clone();
        libraries.push(player.library());
        libraries
    }

    // ========================================================================
    // AutoQueue
    // ========================================================================

    /// Turn auto-queueing for player `name` on with `filter`, or off with
    /// `None`.
    ///
    /// A new session is started before the previous one is cancelled, so an
    /// unknown filter name leaves the current session running.
    #[instrument(skip(self))]
    pub fn set_autoqueuer_filter(&self, name: &str, filter: Option<&str>) -> Result<()> {
        let player = self.player(name)?;

        let session = match filter {
            Some(filter_name) => Some(AutoQueue::start(
                player,
                Arc::clone(&self.inner.filters),
                filter_name,
                self.inner.config.autoqueue(),
            )?),
            None => None,
        };

        let previous = {
            let mut sessions = self.inner.sessions.lock();
            match &session {
                Some(session) => sessions.insert(name.to_string(), session.clone()),
                None => sessions.remove(name),
            }
        };

        if let Some(previous) = &previous {
            info!(filter = previous.filter_name(), "Cancelling AutoQueue session");
            previous.cancel();
        }
        if let Some(session) = &session {
            self.monitor(name, session.clone());
        }

        if previous.is_some() || session.is_some() {
            self.inner.events.emit(JukeboxEvent::AutoQueuerChanged {
                player: name.to_string(),
                filter: filter.map(str::to_string),
            });
        }
        Ok(())
    }

    /// Log the session's outcome and forget it once it ends.
    fn monitor(&self, name: &str, session: AutoQueueSession) {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let player = name.to_string();
        let span = info_span!("autoqueue_monitor", player = %player, session = %session.id());

        tokio::spawn(
            async move {
                match session.done().await {
                    Ok(reason) => info!(%reason, "AutoQueue session ended"),
                    Err(err) => error!(error = %err, "AutoQueue session ended with error"),
                }

                let Some(inner) = inner.upgrade() else {
                    return;
                };
                let forgotten = {
                    let mut sessions = inner.sessions.lock();
                    let current = sessions.get(&player).map(AutoQueueSession::id);
                    current == Some(session.id()) && sessions.remove(&player).is_some()
                };
                if forgotten {
                    inner
                        .events
                        .emit(JukeboxEvent::AutoQueuerChanged { player, filter: None });
                }
            }
            .instrument(span),
        );
    }

    /// Filter names of the live AutoQueue sessions, keyed by player.
    pub fn autoqueuer_filters(&self) -> BTreeMap<String, String> {
        self.inner
            .sessions
            .lock()
            .iter()
            .filter(|(_, session)| !session.is_finished())
            .map(|(player, session)| (player.clone(), session.filter_name().to_string()))
            .collect()
    }

    /// Handle to the AutoQueue session of player `name`, if one is running.
    pub fn autoqueuer_session(&self, name: &str) -> Option<AutoQueueSession> {
        self.inner.sessions.lock().get(name).cloned()
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    pub fn filters(&self) -> &Arc<FilterStore> {
        &self.inner.filters
    }

    pub fn events(&self) -> &EventBus<JukeboxEvent> {
        &self.inner.events
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    /// Cancel every AutoQueue session and wait for them to stop.
    pub async fn shutdown(&self) {
        let sessions: Vec<(String, AutoQueueSession)> =
            self.inner.sessions.lock().drain().collect();
        info!(sessions = sessions.len(), "Shutting down jukebox");

        for (_, session) in &sessions {
            session.cancel();
        }
        for (player, session) in sessions {
            if let Err(err) = session.done().await {
                warn!(player = %player, error = %err, "AutoQueue session failed before shutdown");
            }
        }
    }
}
