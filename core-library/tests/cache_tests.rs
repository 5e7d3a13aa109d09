//! Concurrency properties of the track cache.

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::library::{Art, Library, Track};
use bridge_traits::BridgeError;
use core_library::TrackCache;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Library that grows by one track per fetch and takes a while to answer.
struct GrowingLibrary {
    fetches: AtomicUsize,
    delay: Duration,
}

impl GrowingLibrary {
    fn new(delay: Duration) -> Self {
        Self {
            fetches: AtomicUsize::new(0),
            delay,
        }
    }
}

#[async_trait::async_trait]
impl Library for GrowingLibrary {
    async fn tracks(&self) -> BridgeResult<Vec<Track>> {
        let generation = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        Ok((0..generation * 10)
            .map(|i| Track::new(format!("track-{i}")))
            .collect())
    }

    async fn track_info(&self, uris: &[String]) -> BridgeResult<Vec<Track>> {
        Ok(vec![Track::default(); uris.len()])
    }

    async fn art(&self, uri: &str) -> BridgeResult<Art> {
        Err(BridgeError::NotFound(uri.to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_first_reads_share_one_fetch() {
    let source = Arc::new(GrowingLibrary::new(Duration::from_millis(20)));
    let cache = Arc::new(TrackCache::new(source.clone()));

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.tracks().await.map(|t| t.len()) })
        })
        .collect();

    for reader in readers {
        assert_eq!(reader.await.unwrap().unwrap(), 10);
    }
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_partial_snapshot() {
    let source = Arc::new(GrowingLibrary::new(Duration::from_millis(1)));
    let cache = Arc::new(TrackCache::new(source));
    cache.snapshot().await.unwrap();

    let reloader = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            for _ in 0..20 {
                cache.reload().await.unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for _ in 0..200 {
                    let snapshot = cache.snapshot().await.unwrap();
                    assert_eq!(snapshot.len(), snapshot.indexed());
                    assert_eq!(snapshot.len() % 10, 0);
                    let tracks = cache.tracks().await.unwrap();
                    assert_eq!(tracks.len() % 10, 0);
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    reloader.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(cache.snapshot().await.unwrap().len(), 210);
}
