//! Runs a jukebox with one in-memory player and lets AutoQueue keep it busy.
//!
//! ```text
//! cargo run -p core-service --example autoqueue_demo
//! ```

use anyhow::Result;
use bridge_traits::{Filter, FilterKind, MatchInfo, PlayState, Track};
use core_library::MemoryLibrary;
use core_playback::memory::MemoryPlayer;
use core_playback::PlayerList;
use core_queue::FilterStore;
use core_runtime::config::CoreConfig;
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use core_service::{bootstrap, JukeboxDependencies};
use std::sync::Arc;
use std::time::Duration;

struct Genre(&'static str);

impl Filter for Genre {
    fn kind(&self) -> FilterKind {
        FilterKind::Rules
    }

    fn evaluate(&self, track: &Track) -> Option<MatchInfo> {
        (track.genre == self.0).then(|| MatchInfo::new().with_match("genre", 0, self.0.len()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug),
    )?;

    let library = Arc::new(MemoryLibrary::new(
        (1..=6)
            .map(|i| {
                let genre = if i % 2 == 0 { "ambient" } else { "punk" };
                Track::new(format!("file:///music/{:02}.flac", i))
                    .with_title(format!("Track {}", i))
                    .with_genre(genre)
                    .with_duration(Duration::from_secs(180))
            })
            .collect(),
    ));
    let player = Arc::new(MemoryPlayer::new(library));

    let filters = Arc::new(FilterStore::new());
    filters.set("ambient", Arc::new(Genre("ambient")))?;

    let jukebox = bootstrap(
        JukeboxDependencies::new(PlayerList::new().with_player("lounge", player.clone())?)
            .with_filters(filters)
            .with_config(CoreConfig::builder().shuffle_seed(7).build()?),
    )?;

    jukebox.set_autoqueuer_filter("lounge", Some("ambient"))?;
    if let Some(session) = jukebox.autoqueuer_session("lounge") {
        session.ready().await;
    }

    // Pressing play on an empty playlist reports a stopped player, which
    // AutoQueue answers with its first track.
    jukebox.set_state("lounge", PlayState::Playing).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Running off the end of the playlist leaves the player idle again.
    for _ in 0..3 {
        player.finish_track()?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    jukebox.set_autoqueuer_filter("lounge", None)?;
    jukebox.set_state("lounge", PlayState::Stopped).await?;

    for (i, slot) in jukebox.playlist("lounge").await?.iter().enumerate() {
        tracing::info!(slot = i, title = %slot.track.title, queued_by = ?slot.meta.queued_by, "Playlist");
    }

    jukebox.shutdown().await;
    Ok(())
}
