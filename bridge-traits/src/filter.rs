//! Track filter contract.
//!
//! Matching algorithms (free-text search, rule sets) live outside the core.
//! The core only asks a filter whether a track matches and, if so, where.

use crate::library::Track;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Known filter families. Carried alongside a filter for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Search,
    Rules,
}

/// Byte span of a match inside a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

/// Where a filter matched, keyed by track property name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub matches: BTreeMap<String, Vec<MatchSpan>>,
}

impl MatchInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a span for `property`.
    pub fn add(&mut self, property: impl Into<String>, start: usize, end: usize) {
        self.matches
            .entry(property.into())
            .or_default()
            .push(MatchSpan { start, end });
    }

    pub fn with_match(mut self, property: impl Into<String>, start: usize, end: usize) -> Self {
        self.add(property, start, end);
        self
    }

    /// Total number of spans across all properties.
    pub fn num_matches(&self) -> usize {
        self.matches.values().map(Vec::len).sum()
    }
}

/// A predicate over tracks.
///
/// `evaluate` returns `None` when the track does not match. A match with no
/// recorded spans is still a match.
pub trait Filter: Send + Sync {
    fn kind(&self) -> FilterKind;

    fn evaluate(&self, track: &Track) -> Option<MatchInfo>;
}
