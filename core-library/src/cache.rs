//! Read-through track cache.
//!
//! [`TrackCache`] sits in front of a slow [`Library`] (typically the one a
//! remote backend exposes) and serves its catalogue from an in-memory
//! [`TrackSnapshot`].
//!
//! # Consistency
//!
//! A snapshot is built completely before it is published and is never
//! mutated afterwards. Publication swaps an `Arc` under a write lock, so a
//! reader holds either the old snapshot or the new one, never a mix.
//!
//! # Failure
//!
//! When a reload fails the cache drops its snapshot and remembers the error.
//! Readers get [`LibraryError::CacheFailed`] until a later reload succeeds;
//! the cache does not retry on its own.
//!
//! # Change notifications
//!
//! A cache driven by [`TrackCache::watch`] re-announces
//! [`PlayerEvent::LibraryChanged`] on its own bus ([`TrackCache::events`])
//! once the reload has finished. Consumers that re-read the catalogue when
//! the library changes should listen there rather than on the player's bus,
//! which reports the change before the new snapshot exists.

use crate::error::{LibraryError, Result};
use core_runtime::config::EventBusConfig;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::library::{Art, Library, Track};
use core_runtime::events::{EventBus, PlayerEvent};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Immutable catalogue snapshot: the track list and a URI index into it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackSnapshot {
    tracks: Vec<Track>,
    index: HashMap<String, usize>,
}

impl TrackSnapshot {
    /// Build a snapshot. When a URI repeats, the index points at its first
    /// occurrence.
    pub fn new(tracks: Vec<Track>) -> Self {
        let mut index = HashMap::with_capacity(tracks.len());
        for (position, track) in tracks.iter().enumerate() {
            index.entry(track.uri.clone()).or_insert(position);
        }
        Self { tracks, index }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, uri: &str) -> Option<&Track> {
        self.index.get(uri).map(|&position| &self.tracks[position])
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Number of distinct URIs in the index.
    pub fn indexed(&self) -> usize {
        self.index.len()
    }
}

enum CacheState {
    Empty,
    Ready(Arc<TrackSnapshot>),
    Failed(BridgeError),
}

/// Read-through cache over a [`Library`].
pub struct TrackCache {
    source: Arc<dyn Library>,
    state: RwLock<CacheState>,
    // Serializes reloads so concurrent first readers share one fetch.
    reload_lock: Mutex<()>,
    events: EventBus<PlayerEvent>,
}

impl TrackCache {
    pub fn new(source: Arc<dyn Library>) -> Self {
        Self::with_events(source, EventBusConfig::default())
    }

    pub fn with_events(source: Arc<dyn Library>, events: EventBusConfig) -> Self {
        Self {
            source,
            state: RwLock::new(CacheState::Empty),
            reload_lock: Mutex::new(()),
            events: EventBus::with_config(events),
        }
    }

    /// Bus carrying [`PlayerEvent::LibraryChanged`] after each watched reload.
    pub fn events(&self) -> &EventBus<PlayerEvent> {
        &self.events
    }

    /// Current snapshot, loading it first if the cache is empty.
    pub async fn snapshot(&self) -> Result<Arc<TrackSnapshot>> {
        if let Some(published) = self.published() {
            return published;
        }

        let _reload = self.reload_lock.lock().await;
        // Another reader may have finished loading while we waited.
        if let Some(published) = self.published() {
            return published;
        }
        self.load().await
    }

    /// Fetch the full catalogue again and publish it.
    ///
    /// Readers keep seeing the previous snapshot until the new one is ready.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<Arc<TrackSnapshot>> {
        let _reload = self.reload_lock.lock().await;
        self.load().await
    }

    /// Forget the current snapshot or error; the next read reloads.
    pub fn invalidate(&self) {
        *self.state.write() = CacheState::Empty;
        debug!("Track cache invalidated");
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.read(), CacheState::Ready(_))
    }

    /// The error left behind by the last failed reload, if any.
    pub fn last_error(&self) -> Option<BridgeError> {
        match &*self.state.read() {
            CacheState::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// Reload whenever `events` reports [`PlayerEvent::LibraryChanged`].
    ///
    /// Each reload, successful or not, is followed by a `LibraryChanged` on
    /// [`events`](Self::events). The task ends when `token` is cancelled or
    /// the bus goes away.
    pub fn watch(
        self: &Arc<Self>,
        events: &EventBus<PlayerEvent>,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        let mut subscription = events
            .listen_until(token)
            .filter(|event| matches!(event, PlayerEvent::LibraryChanged));

        tokio::spawn(async move {
            while subscription.recv().await.is_some() {
                if let Err(err) = cache.reload().await {
                    warn!(error = %err, "Library change reload failed");
                }
                cache.events.emit(PlayerEvent::LibraryChanged);
            }
            debug!("Track cache watcher stopped");
        })
    }

    fn published(&self) -> Option<Result<Arc<TrackSnapshot>>> {
        match &*self.state.read() {
            CacheState::Empty => None,
            CacheState::Ready(snapshot) => Some(Ok(Arc::clone(snapshot))),
            CacheState::Failed(err) => Some(Err(LibraryError::CacheFailed(err.clone()))),
        }
    }

    async fn load(&self) -> Result<Arc<TrackSnapshot>> {
        match self.source.tracks().await {
            Ok(tracks) => {
                let snapshot = Arc::new(TrackSnapshot::new(tracks));
                *self.state.write() = CacheState::Ready(Arc::clone(&snapshot));
                info!(tracks = snapshot.len(), "Track cache loaded");
                Ok(snapshot)
            }
            Err(err) => {
                warn!(error = %err, "Track cache reload failed");
                *self.state.write() = CacheState::Failed(err.clone());
                Err(LibraryError::CacheFailed(err))
            }
        }
    }
}

#[async_trait::async_trait]
impl Library for TrackCache {
    async fn tracks(&self) -> BridgeResult<Vec<Track>> {
        Ok(self.snapshot().await?.tracks().to_vec())
    }

    /// Served from the snapshot; URIs it does not know are looked up in the
    /// wrapped library in one batch.
    async fn track_info(&self, uris: &[String]) -> BridgeResult<Vec<Track>> {
        let snapshot = self.snapshot().await?;

        let mut found = Vec::with_capacity(uris.len());
        let mut misses = Vec::new();
        for (position, uri) in uris.iter().enumerate() {
            match snapshot.get(uri) {
                Some(track) => found.push(track.clone()),
                None => {
                    found.push(Track::default());
                    misses.push(position);
                }
            }
        }

        if !misses.is_empty() {
            let missing: Vec<String> = misses.iter().map(|&i| uris[i].clone()).collect();
            debug!(count = missing.len(), "Track cache miss, asking source");
            let fetched = self.source.track_info(&missing).await?;
            for (position, track) in misses.into_iter().zip(fetched) {
                found[position] = track;
            }
        }

        Ok(found)
    }

    async fn art(&self, uri: &str) -> BridgeResult<Art> {
        self.source.art(uri).await
    }
}

impl fmt::Debug for TrackCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.read() {
            CacheState::Empty => "empty".to_string(),
            CacheState::Ready(snapshot) => format!("ready ({} tracks)", snapshot.len()),
            CacheState::Failed(err) => format!("failed ({})", err),
        };
        f.debug_struct("TrackCache").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    mock! {
        pub Source {}

        #[async_trait::async_trait]
        impl Library for Source {
            async fn tracks(&self) -> BridgeResult<Vec<Track>>;
            async fn track_info(&self, uris: &[String]) -> BridgeResult<Vec<Track>>;
            async fn art(&self, uri: &str) -> BridgeResult<Art>;
        }
    }

    fn catalogue() -> Vec<Track> {
        vec![
            Track::new("a").with_title("Alpha"),
            Track::new("b").with_title("Bravo"),
            Track::new("c").with_title("Charlie"),
        ]
    }

    #[test]
    fn test_snapshot_index_points_at_first_duplicate() {
        let snapshot = TrackSnapshot::new(vec![
            Track::new("a").with_title("first"),
            Track::new("b"),
            Track::new("a").with_title("second"),
        ]);

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.indexed(), 2);
        assert_eq!(snapshot.get("a").map(|t| t.title.as_str()), Some("first"));
        assert!(snapshot.get("z").is_none());
    }

    #[tokio::test]
    async fn test_first_read_loads_once() {
        let mut source = MockSource::new();
        source.expect_tracks().times(1).returning(|| Ok(catalogue()));
        let cache = TrackCache::new(Arc::new(source));

        assert!(!cache.is_loaded());
        assert_eq!(cache.tracks().await.unwrap().len(), 3);
        assert_eq!(cache.tracks().await.unwrap().len(), 3);
        assert!(cache.is_loaded());
    }

    #[tokio::test]
    async fn test_track_info_falls_back_to_source() {
        let mut source = MockSource::new();
        source.expect_tracks().times(1).returning(|| Ok(catalogue()));
        source
            .expect_track_info()
            .withf(|uris| uris.len() == 2 && uris[0] == "stream://x" && uris[1] == "nope")
            .times(1)
            .returning(|_| Ok(vec![Track::new("stream://x"), Track::default()]));
        let cache = TrackCache::new(Arc::new(source));

        let uris: Vec<String> = ["b", "stream://x", "a", "nope"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let info = cache.track_info(&uris).await.unwrap();

        assert_eq!(info[0].title, "Bravo");
        assert_eq!(info[1].uri, "stream://x");
        assert_eq!(info[2].title, "Alpha");
        assert!(info[3].is_zero());
    }

    #[tokio::test]
    async fn test_failed_reload_is_surfaced_not_stale() {
        let mut source = MockSource::new();
        let mut calls = 0;
        source.expect_tracks().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(catalogue())
            } else {
                Err(BridgeError::Unavailable("library offline".to_string()))
            }
        });
        let cache = TrackCache::new(Arc::new(source));

        assert_eq!(cache.tracks().await.unwrap().len(), 3);
        assert!(cache.reload().await.is_err());

        let err = cache.snapshot().await.unwrap_err();
        assert_eq!(
            err,
            LibraryError::CacheFailed(BridgeError::Unavailable("library offline".to_string()))
        );
        assert!(err.is_transient());
        assert!(cache.last_error().is_some());
        // Still no automatic retry: the mock would panic on a third call.
        assert!(cache.tracks().await.is_err());
    }

    #[tokio::test]
    async fn test_invalidate_recovers_from_failure() {
        let mut source = MockSource::new();
        let mut calls = 0;
        source.expect_tracks().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Err(BridgeError::Unavailable("booting".to_string()))
            } else {
                Ok(catalogue())
            }
        });
        let cache = TrackCache::new(Arc::new(source));

        assert!(cache.snapshot().await.is_err());
        cache.invalidate();
        assert_eq!(cache.snapshot().await.unwrap().len(), 3);
        assert!(cache.last_error().is_none());
    }

    #[tokio::test]
    async fn test_art_passes_through() {
        let mut source = MockSource::new();
        source
            .expect_art()
            .times(1)
            .returning(|_| Ok(Art::new(vec![1u8, 2, 3], "image/png")));
        let cache = TrackCache::new(Arc::new(source));

        let art = cache.art("a").await.unwrap();
        assert_eq!(art.mime_type, "image/png");
        assert_eq!(&art.data[..], &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_watch_reloads_on_library_change() {
        let mut source = MockSource::new();
        let mut calls = 0;
        source.expect_tracks().times(2).returning(move || {
            calls += 1;
            let mut tracks = catalogue();
            if calls > 1 {
                tracks.push(Track::new("d"));
            }
            Ok(tracks)
        });
        let cache = Arc::new(TrackCache::new(Arc::new(source)));
        assert_eq!(cache.snapshot().await.unwrap().len(), 3);

        let bus = EventBus::new(8);
        let token = CancellationToken::new();
        let mut refreshed = cache.events().listen();
        let watcher = cache.watch(&bus, token.clone());

        bus.emit(PlayerEvent::VolumeChanged { level: 3 });
        bus.emit(PlayerEvent::LibraryChanged);

        // The cache announces the change only once the new snapshot is out.
        assert_eq!(refreshed.recv().await, Some(PlayerEvent::LibraryChanged));
        assert_eq!(cache.tracks().await.unwrap().len(), 4);

        token.cancel();
        watcher.await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_watched_reload_is_announced() {
        let mut source = MockSource::new();
        source
            .expect_tracks()
            .times(1)
            .returning(|| Err(BridgeError::Unavailable("share offline".to_string())));
        let cache = Arc::new(TrackCache::new(Arc::new(source)));

        let bus = EventBus::new(8);
        let token = CancellationToken::new();
        let mut refreshed = cache.events().listen();
        let watcher = cache.watch(&bus, token.clone());

        bus.emit(PlayerEvent::LibraryChanged);

        assert_eq!(refreshed.recv().await, Some(PlayerEvent::LibraryChanged));
        assert!(cache.last_error().is_some());

        token.cancel();
        watcher.await.unwrap();
    }
}
