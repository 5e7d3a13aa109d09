//! # Playlist Reconciliation Engine
//!
//! Backends store bare track lists. [`MetaPlaylist`] keeps a shadow array of
//! [`TrackMeta`] next to them and re-derives it from the backend's order on
//! every access, so per-slot metadata survives changes made by other clients.
//!
//! ## Reconciliation
//!
//! Every call first fetches the backend's tracks and walks them left to
//! right. For a slot with URI `u` that has already been matched `k` times in
//! this pass, the metadata of the `(k + 1)`-th occurrence of `u` in the
//! previous shadow is carried over. Slots with no counterpart (queued by a
//! client that bypasses the engine) default to [`QueuedBy::User`].
//!
//! ```text
//!   previous:  [A:user] [B:user] [A:system]
//!   backend:   [A]      [A]      [B]
//!   result:    [A:user] [A:system] [B:user]
//! ```
//!
//! ## Atomicity
//!
//! All calls are serialized on one async lock. A mutation builds the next
//! shadow off to the side and commits it only after the backend accepted the
//! change, so a failed call leaves the shadow untouched.

use crate::error::{PlaybackError, Result};
use bridge_traits::library::Track;
use bridge_traits::playback::BackendPlaylist;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Who put a track into the playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueuedBy {
    #[default]
    User,
    System,
}

/// Metadata attached to one playlist slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TrackMeta {
    pub queued_by: QueuedBy,
}

impl TrackMeta {
    pub fn user() -> Self {
        Self {
            queued_by: QueuedBy::User,
        }
    }

    pub fn system() -> Self {
        Self {
            queued_by: QueuedBy::System,
        }
    }
}

/// A playlist slot: the track and its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTrack {
    pub track: Track,
    pub meta: TrackMeta,
}

impl MetaTrack {
    pub fn new(track: Track, meta: TrackMeta) -> Self {
        Self { track, meta }
    }
}

// ============================================================================
// Shadow
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
struct Shadow {
    tracks: Vec<Track>,
    meta: Vec<TrackMeta>,
}

impl Shadow {
    fn len(&self) -> usize {
        self.tracks.len()
    }

    fn check(&self) -> Result<()> {
        if self.tracks.len() != self.meta.len() {
            return Err(PlaybackError::ReconciliationInvariantViolation(format!(
                "shadow holds {} tracks but {} metadata entries",
                self.tracks.len(),
                self.meta.len()
            )));
        }
        Ok(())
    }

    /// Carry metadata over onto the backend's current order.
    fn reconcile(&self, fresh: Vec<Track>) -> Result<Shadow> {
        self.check()?;

        let meta = {
            let mut occurrences: HashMap<&str, Vec<usize>> = HashMap::new();
            for (position, track) in self.tracks.iter().enumerate() {
                occurrences
                    .entry(track.uri.as_str())
                    .or_default()
                    .push(position);
            }

            let mut matched: HashMap<&str, usize> = HashMap::new();
            let mut meta = Vec::with_capacity(fresh.len());
            for track in &fresh {
                let uri = track.uri.as_str();
                let seen = matched.entry(uri).or_insert(0);
                match occurrences.get(uri).and_then(|found| found.get(*seen)) {
                    Some(&previous) => {
                        *seen += 1;
                        meta.push(self.meta[previous]);
                    }
                    None => meta.push(TrackMeta::user()),
                }
            }
            meta
        };

        Ok(Shadow {
            tracks: fresh,
            meta,
        })
    }

    fn insert(&mut self, at: usize, tracks: Vec<Track>, metas: Vec<TrackMeta>) -> Result<()> {
        if at > self.len() {
            return Err(PlaybackError::ReconciliationInvariantViolation(format!(
                "cannot splice at {} into a shadow of {}",
                at,
                self.len()
            )));
        }
        self.tracks.splice(at..at, tracks);
        self.meta.splice(at..at, metas);
        Ok(())
    }

    fn move_slot(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.len();
        if from >= len || to >= len {
            return Err(PlaybackError::ReconciliationInvariantViolation(format!(
                "cannot move {} to {} in a shadow of {}",
                from, to, len
            )));
        }
        let track = self.tracks.remove(from);
        let meta = self.meta.remove(from);
        self.tracks.insert(to, track);
        self.meta.insert(to, meta);
        Ok(())
    }

    /// `positions` must be sorted ascending without duplicates.
    fn remove(&mut self, positions: &[usize]) -> Result<()> {
        if let Some(&last) = positions.last() {
            if last >= self.len() {
                return Err(PlaybackError::ReconciliationInvariantViolation(format!(
                    "cannot remove {} from a shadow of {}",
                    last,
                    self.len()
                )));
            }
        }
        for &position in positions.iter().rev() {
            self.tracks.remove(position);
            self.meta.remove(position);
        }
        Ok(())
    }

    fn meta_tracks(&self) -> Vec<MetaTrack> {
        self.tracks
            .iter()
            .zip(&self.meta)
            .map(|(track, meta)| MetaTrack::new(track.clone(), *meta))
            .collect()
    }
}

fn check_position(position: usize, len: usize) -> Result<()> {
    if position >= len {
        return Err(PlaybackError::PositionOutOfRange { position, len });
    }
    Ok(())
}

// ============================================================================
// MetaPlaylist
// ============================================================================

/// Playlist with durable per-slot metadata over a bare backend playlist.
///
/// One instance exists per player. Everything that reads or changes the
/// player's playlist goes through it.
pub struct MetaPlaylist {
    backend: Arc<dyn BackendPlaylist>,
    shadow: Mutex<Shadow>,
}

impl MetaPlaylist {
    pub fn new(backend: Arc<dyn BackendPlaylist>) -> Self {
        Self {
            backend,
            shadow: Mutex::new(Shadow::default()),
        }
    }

    async fn reconciled(&self, shadow: &Shadow) -> Result<Shadow> {
        let fresh = self.backend.tracks().await?;
        let next = shadow.reconcile(fresh)?;
        debug!(len = next.len(), "Playlist reconciled");
        Ok(next)
    }

    /// Insert `tracks` with their `metas` at `pos`; `None` appends.
    ///
    /// `tracks` and `metas` must have the same length.
    #[instrument(skip(self, tracks, metas), fields(count = tracks.len()))]
    pub async fn insert(
        &self,
        pos: Option<usize>,
        tracks: Vec<Track>,
        metas: Vec<TrackMeta>,
    ) -> Result<()> {
        if tracks.len() != metas.len() {
            return Err(PlaybackError::MetadataLengthMismatch {
                tracks: tracks.len(),
                metas: metas.len(),
            });
        }

        let mut shadow = self.shadow.lock().await;
        let mut next = self.reconciled(&shadow).await?;

        let at = match pos {
            None => next.len(),
            Some(position) if position <= next.len() => position,
            Some(position) => {
                return Err(PlaybackError::PositionOutOfRange {
                    position,
                    len: next.len(),
                })
            }
        };

        if !tracks.is_empty() {
            self.backend.insert(pos, &tracks).await?;
            next.insert(at, tracks, metas)?;
        }

        *shadow = next;
        Ok(())
    }

    /// Insert tracks that already carry their metadata.
    pub async fn insert_meta_tracks(&self, pos: Option<usize>, items: Vec<MetaTrack>) -> Result<()> {
        let (tracks, metas) = items
            .into_iter()
            .map(|item| (item.track, item.meta))
            .unzip();
        self.insert(pos, tracks, metas).await
    }

    /// Move the slot at `from` so that it ends up at index `to`.
    #[instrument(skip(self))]
    pub async fn move_track(&self, from: usize, to: usize) -> Result<()> {
        let mut shadow = self.shadow.lock().await;
        let mut next = self.reconciled(&shadow).await?;
        check_position(from, next.len())?;
        check_position(to, next.len())?;

        if from != to {
            self.backend.move_track(from, to).await?;
            next.move_slot(from, to)?;
        }

        *shadow = next;
        Ok(())
    }

    /// Remove the slots at `positions`. Order and duplicates do not matter.
    #[instrument(skip(self, positions), fields(count = positions.len()))]
    pub async fn remove(&self, positions: &[usize]) -> Result<()> {
        let mut sorted = positions.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut shadow = self.shadow.lock().await;
        let mut next = self.reconciled(&shadow).await?;
        if let Some(&last) = sorted.last() {
            check_position(last, next.len())?;
            self.backend.remove(&sorted).await?;
            next.remove(&sorted)?;
        }

        *shadow = next;
        Ok(())
    }

    pub async fn tracks(&self) -> Result<Vec<Track>> {
        Ok(self.refresh().await?.tracks)
    }

    pub async fn meta(&self) -> Result<Vec<TrackMeta>> {
        Ok(self.refresh().await?.meta)
    }

    /// Tracks and metadata from a single reconciliation pass.
    pub async fn meta_tracks(&self) -> Result<Vec<MetaTrack>> {
        Ok(self.refresh().await?.meta_tracks())
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.refresh().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    async fn refresh(&self) -> Result<Shadow> {
        let mut shadow = self.shadow.lock().await;
        let next = self.reconciled(&shadow).await?;
        *shadow = next.clone();
        Ok(next)
    }
}

impl fmt::Debug for MetaPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known = self
            .shadow
            .try_lock()
            .map(|shadow| shadow.len().to_string())
            .unwrap_or_else(|_| "locked".to_string());
        f.debug_struct("MetaPlaylist")
            .field("known_len", &known)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shadow(slots: &[(&str, QueuedBy)]) -> Shadow {
        Shadow {
            tracks: slots.iter().map(|(uri, _)| Track::new(*uri)).collect(),
            meta: slots
                .iter()
                .map(|(_, queued_by)| TrackMeta {
                    queued_by: *queued_by,
                })
                .collect(),
        }
    }

    fn tracks(uris: &[&str]) -> Vec<Track> {
        uris.iter().map(|uri| Track::new(*uri)).collect()
    }

    fn origins(shadow: &Shadow) -> Vec<QueuedBy> {
        shadow.meta.iter().map(|m| m.queued_by).collect()
    }

    use QueuedBy::{System, User};

    #[test]
    fn test_reconcile_unchanged_order_keeps_meta() {
        let previous = shadow(&[("a", System), ("b", User), ("c", System)]);
        let next = previous.reconcile(tracks(&["a", "b", "c"])).unwrap();
        assert_eq!(next, previous);
    }

    #[test]
    fn test_reconcile_follows_duplicates_in_order() {
        let previous = shadow(&[("a", User), ("b", User), ("a", System)]);
        let next = previous.reconcile(tracks(&["a", "a", "b"])).unwrap();
        assert_eq!(origins(&next), [User, System, User]);
    }

    #[test]
    fn test_reconcile_unknown_tracks_default_to_user() {
        let previous = shadow(&[("a", System)]);
        let next = previous.reconcile(tracks(&["x", "a", "a"])).unwrap();
        // Only one "a" was known; the second is new.
        assert_eq!(origins(&next), [User, System, User]);
    }

    #[test]
    fn test_reconcile_removed_tracks_drop_meta() {
        let previous = shadow(&[("a", System), ("b", System)]);
        let next = previous.reconcile(tracks(&["b"])).unwrap();
        assert_eq!(origins(&next), [System]);
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn test_reconcile_rejects_inconsistent_shadow() {
        let mut previous = shadow(&[("a", User)]);
        previous.meta.push(TrackMeta::system());
        let err = previous.reconcile(tracks(&["a"])).unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::ReconciliationInvariantViolation(_)
        ));
    }

    #[test]
    fn test_splice_operations() {
        let mut s = shadow(&[("a", User), ("b", User)]);
        s.insert(1, tracks(&["x"]), vec![TrackMeta::system()]).unwrap();
        assert_eq!(origins(&s), [User, System, User]);

        s.move_slot(1, 2).unwrap();
        assert_eq!(s.tracks[2].uri, "x");
        assert_eq!(s.meta[2].queued_by, System);

        s.remove(&[0, 2]).unwrap();
        assert_eq!(s.tracks, tracks(&["b"]));

        assert!(s.move_slot(0, 1).is_err());
        assert!(s.remove(&[1]).is_err());
        assert!(s.insert(5, vec![], vec![]).is_err());
    }

    mod backend {
        use super::*;
        use bridge_traits::error::{BridgeError, Result as BridgeResult};
        use mockall::mock;
        use mockall::predicate::eq;

        mock! {
            pub Backend {}

            #[async_trait::async_trait]
            impl BackendPlaylist for Backend {
                async fn insert(&self, pos: Option<usize>, tracks: &[Track]) -> BridgeResult<()>;
                async fn move_track(&self, from: usize, to: usize) -> BridgeResult<()>;
                async fn remove(&self, positions: &[usize]) -> BridgeResult<()>;
                async fn tracks(&self) -> BridgeResult<Vec<Track>>;
                async fn len(&self) -> BridgeResult<usize>;
            }
        }

        #[tokio::test]
        async fn test_move_to_same_slot_skips_backend() {
            let mut backend = MockBackend::new();
            backend
                .expect_tracks()
                .returning(|| Ok(tracks(&["a", "b"])));
            backend.expect_move_track().never();
            let playlist = MetaPlaylist::new(Arc::new(backend));

            playlist.move_track(1, 1).await.unwrap();
        }

        #[tokio::test]
        async fn test_rejected_insert_is_not_recorded() {
            let mut backend = MockBackend::new();
            backend.expect_tracks().returning(|| Ok(tracks(&["a"])));
            backend
                .expect_insert()
                .withf(|pos, tracks| *pos == Some(0) && tracks.len() == 1)
                .times(1)
                .returning(|_, _| Err(BridgeError::OperationFailed("read-only".to_string())));
            let playlist = MetaPlaylist::new(Arc::new(backend));

            let err = playlist
                .insert(Some(0), tracks(&["x"]), vec![TrackMeta::system()])
                .await
                .unwrap_err();
            assert!(!err.is_transient());
            assert_eq!(playlist.meta().await.unwrap(), vec![TrackMeta::user()]);
        }

        #[tokio::test]
        async fn test_remove_sends_sorted_unique_positions() {
            let mut backend = MockBackend::new();
            backend
                .expect_tracks()
                .times(1)
                .returning(|| Ok(tracks(&["a", "b", "c", "d"])));
            backend
                .expect_remove()
                .withf(|positions| positions.len() == 2 && positions[0] == 0 && positions[1] == 2)
                .times(1)
                .returning(|_| Ok(()));
            let playlist = MetaPlaylist::new(Arc::new(backend));

            playlist.remove(&[2, 0, 2]).await.unwrap();
        }

        #[tokio::test]
        async fn test_out_of_range_move_reaches_no_backend_mutation() {
            let mut backend = MockBackend::new();
            backend.expect_tracks().returning(|| Ok(tracks(&["a"])));
            backend.expect_move_track().with(eq(0), eq(3)).never();
            let playlist = MetaPlaylist::new(Arc::new(backend));

            assert_eq!(
                playlist.move_track(0, 3).await,
                Err(PlaybackError::PositionOutOfRange { position: 3, len: 1 })
            );
        }
    }

    #[test]
    fn test_meta_serializes_lowercase() {
        let json = serde_json::to_string(&TrackMeta::system()).unwrap();
        assert_eq!(json, r#"{"queued_by":"system"}"#);
    }
}
