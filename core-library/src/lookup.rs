//! Track lookup across several libraries.

use bridge_traits::error::Result;
use bridge_traits::library::{Library, Track};
use futures::future::try_join_all;
use std::sync::Arc;

/// Resolve `uris` against every library at once.
///
/// For each URI the first library in `libraries` that knows it wins. URIs
/// nobody knows come back as the zero track. Any library error fails the
/// whole lookup.
pub async fn all_track_info(libraries: &[Arc<dyn Library>], uris: &[String]) -> Result<Vec<Track>> {
    let answers = try_join_all(libraries.iter().map(|library| library.track_info(uris))).await?;

    let mut tracks = vec![Track::default(); uris.len()];
    for answer in answers {
        for (slot, track) in tracks.iter_mut().zip(answer) {
            if slot.is_zero() && !track.is_zero() {
                *slot = track;
            }
        }
    }
    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLibrary;
    use bridge_traits::error::BridgeError;

    fn uris(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_lowest_index_library_wins() {
        let streams: Arc<dyn Library> = Arc::new(MemoryLibrary::new(vec![
            Track::new("x").with_title("from streams"),
        ]));
        let local: Arc<dyn Library> = Arc::new(MemoryLibrary::new(vec![
            Track::new("x").with_title("from local"),
            Track::new("y").with_title("only local"),
        ]));

        let found = all_track_info(&[streams, local], &uris(&["y", "x", "z"]))
            .await
            .unwrap();

        assert_eq!(found[0].title, "only local");
        assert_eq!(found[1].title, "from streams");
        assert!(found[2].is_zero());
    }

    #[tokio::test]
    async fn test_any_failure_fails_lookup() {
        let healthy: Arc<dyn Library> = Arc::new(MemoryLibrary::new(vec![Track::new("x")]));
        let broken = MemoryLibrary::new(vec![]);
        broken.set_available(false);
        let broken: Arc<dyn Library> = Arc::new(broken);

        let err = all_track_info(&[healthy, broken], &uris(&["x"]))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_no_libraries_yields_zero_tracks() {
        let found = all_track_info(&[], &uris(&["a", "b"])).await.unwrap();
        assert_eq!(found, vec![Track::default(), Track::default()]);
    }
}
