//! Track catalogue contract.
//!
//! A [`Library`] is the read side of a media collection: the full list of
//! tracks, lookup by URI and album art. Player backends hand one out, and the
//! core layers caching and cross-library lookup on top of it.

use crate::error::Result;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable description of a single track.
///
/// The URI is the identity: two tracks are the same iff their URIs are equal.
/// Playlists may still hold several entries with the same URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Track {
    pub uri: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub album_artist: String,
    #[serde(default)]
    pub album_track: String,
    #[serde(default)]
    pub album_disc: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub duration: Duration,
    #[serde(default)]
    pub has_art: bool,
}

impl Track {
    /// Create a track with only its URI set.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_art(mut self, has_art: bool) -> Self {
        self.has_art = has_art;
        self
    }

    /// The zero track stands in for URIs a library does not know.
    pub fn is_zero(&self) -> bool {
        self.uri.is_empty()
    }

    /// Look up a textual attribute by its property name.
    ///
    /// Filters use this to address fields generically. Unknown names yield
    /// `None`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        let value = match name {
            "uri" => &self.uri,
            "artist" => &self.artist,
            "title" => &self.title,
            "album" => &self.album,
            "albumartist" => &self.album_artist,
            "albumtrack" => &self.album_track,
            "albumdisc" => &self.album_disc,
            "genre" => &self.genre,
            _ => return None,
        };
        Some(value.as_str())
    }
}

/// Raw album art image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Art {
    pub data: Bytes,
    pub mime_type: String,
    pub modified: Option<DateTime<Utc>>,
}

impl Art {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            modified: None,
        }
    }
}

/// Read access to a track catalogue.
///
/// # Contract
///
/// - `tracks` returns every track the library knows, in a stable order.
/// - `track_info` returns exactly one entry per requested URI, in request
///   order; unknown URIs map to `Track::default()`.
/// - `art` fails with [`BridgeError::NotFound`](crate::error::BridgeError::NotFound)
///   when the track has no art.
#[async_trait::async_trait]
pub trait Library: Send + Sync {
    async fn tracks(&self) -> Result<Vec<Track>>;

    async fn track_info(&self, uris: &[String]) -> Result<Vec<Track>>;

    async fn art(&self, uri: &str) -> Result<Art>;
}
