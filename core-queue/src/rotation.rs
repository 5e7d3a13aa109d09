//! Shuffled, circular candidate list for auto-queueing.

use bridge_traits::{Filter, Track};
use core_library::filter_tracks;
use rand::seq::SliceRandom;
use rand::Rng;

/// Tracks matching a filter in shuffled order, handed out round-robin.
#[derive(Debug, Clone, Default)]
pub struct CandidateRotation {
    candidates: Vec<Track>,
    cursor: usize,
}

impl CandidateRotation {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Evaluate `filter` against `library` and shuffle the matches.
    pub fn build<R: Rng + ?Sized>(filter: &dyn Filter, library: &[Track], rng: &mut R) -> Self {
        let mut candidates: Vec<Track> = filter_tracks(filter, library)
            .into_iter()
            .map(|result| result.track)
            .collect();
        candidates.shuffle(rng);
        Self {
            candidates,
            cursor: 0,
        }
    }

    /// Use `tracks` in the given order.
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        Self {
            candidates: tracks,
            cursor: 0,
        }
    }

    /// Candidate at the cursor; the cursor then advances, wrapping at the end.
    pub fn next(&mut self) -> Option<Track> {
        let track = self.candidates.get(self.cursor)?.clone();
        self.cursor = (self.cursor + 1) % self.candidates.len();
        Some(track)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.candidates
    }
}
