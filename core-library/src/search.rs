//! Filter evaluation over track lists.

use bridge_traits::filter::{Filter, MatchInfo};
use bridge_traits::library::Track;
use serde::{Deserialize, Serialize};

/// A track that matched a filter, with the match positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub track: Track,
    pub info: MatchInfo,
}

impl SearchResult {
    pub fn num_matches(&self) -> usize {
        self.info.num_matches()
    }
}

/// Every track in `tracks` that `filter` accepts, in input order.
pub fn filter_tracks(filter: &dyn Filter, tracks: &[Track]) -> Vec<SearchResult> {
    tracks
        .iter()
        .filter_map(|track| {
            filter.evaluate(track).map(|info| SearchResult {
                track: track.clone(),
                info,
            })
        })
        .collect()
}

/// Sort by descending match count. Ties keep their input order.
pub fn rank_by_matches(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.num_matches().cmp(&a.num_matches()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::filter::FilterKind;

    /// Matches every occurrence of a needle in the title.
    struct TitleContains(&'static str);

    impl Filter for TitleContains {
        fn kind(&self) -> FilterKind {
            FilterKind::Search
        }

        fn evaluate(&self, track: &Track) -> Option<MatchInfo> {
            let mut info = MatchInfo::new();
            for (start, hit) in track.title.match_indices(self.0) {
                info.add("title", start, start + hit.len());
            }
            (info.num_matches() > 0).then_some(info)
        }
    }

    fn tracks() -> Vec<Track> {
        vec![
            Track::new("1").with_title("la"),
            Track::new("2").with_title("silence"),
            Track::new("3").with_title("la la la"),
            Track::new("4").with_title("la la"),
        ]
    }

    #[test]
    fn test_filter_keeps_input_order() {
        let results = filter_tracks(&TitleContains("la"), &tracks());
        let uris: Vec<_> = results.iter().map(|r| r.track.uri.as_str()).collect();
        assert_eq!(uris, ["1", "3", "4"]);
    }

    #[test]
    fn test_rank_by_matches() {
        let mut results = filter_tracks(&TitleContains("la"), &tracks());
        rank_by_matches(&mut results);

        let ranked: Vec<_> = results
            .iter()
            .map(|r| (r.track.uri.as_str(), r.num_matches()))
            .collect();
        assert_eq!(ranked, [("3", 3), ("4", 2), ("1", 1)]);
    }

    #[test]
    fn test_no_matches() {
        assert!(filter_tracks(&TitleContains("zz"), &tracks()).is_empty());
    }
}
