//! In-memory [`Library`] for synthetic backends and tests.

use bridge_traits::error::{BridgeError, Result};
use bridge_traits::library::{Art, Library, Track};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// A library whose contents live in process memory.
///
/// Contents can be replaced at any time; pair this with a
/// [`PlayerEvent::LibraryChanged`](core_runtime::events::PlayerEvent::LibraryChanged)
/// emit so caches pick the change up.
#[derive(Debug)]
pub struct MemoryLibrary {
    tracks: RwLock<Vec<Track>>,
    art: RwLock<HashMap<String, Art>>,
    available: AtomicBool,
}

impl MemoryLibrary {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks: RwLock::new(tracks),
            art: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_tracks(&self, tracks: Vec<Track>) {
        *self.tracks.write() = tracks;
    }

    pub fn set_art(&self, uri: impl Into<String>, art: Art) {
        self.art.write().insert(uri.into(), art);
    }

    /// While unavailable every call fails with [`BridgeError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BridgeError::Unavailable("memory library offline".to_string()))
        }
    }
}

impl Default for MemoryLibrary {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait::async_trait]
impl Library for MemoryLibrary {
    async fn tracks(&self) -> Result<Vec<Track>> {
        self.check_available()?;
        Ok(self.tracks.read().clone())
    }

    async fn track_info(&self, uris: &[String]) -> Result<Vec<Track>> {
        self.check_available()?;
        let tracks = self.tracks.read();
        Ok(uris
            .iter()
            .map(|uri| {
                tracks
                    .iter()
                    .find(|track| &track.uri == uri)
                    .cloned()
                    .unwrap_or_default()
            })
            .collect())
    }

    async fn art(&self, uri: &str) -> Result<Art> {
        self.check_available()?;
        self.art
            .read()
            .get(uri)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(format!("no art for {}", uri)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_track_info_preserves_request_order() {
        let library = MemoryLibrary::new(vec![Track::new("a"), Track::new("b")]);
        let uris = vec!["b".to_string(), "missing".to_string(), "a".to_string()];

        let info = library.track_info(&uris).await.unwrap();
        assert_eq!(info[0].uri, "b");
        assert!(info[1].is_zero());
        assert_eq!(info[2].uri, "a");
    }

    #[tokio::test]
    async fn test_missing_art_is_not_found() {
        let library = MemoryLibrary::default();
        library.set_art("a", Art::new(vec![0u8], "image/jpeg"));

        assert!(library.art("a").await.is_ok());
        assert!(matches!(
            library.art("b").await,
            Err(BridgeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable_library_fails() {
        let library = MemoryLibrary::new(vec![Track::new("a")]);
        library.set_available(false);
        assert!(matches!(
            library.tracks().await,
            Err(BridgeError::Unavailable(_))
        ));

        library.set_available(true);
        assert_eq!(library.tracks().await.unwrap().len(), 1);
    }
}
