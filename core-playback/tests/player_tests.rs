//! Player contract checks against the in-memory backend.

use bridge_traits::library::Track;
use bridge_traits::playback::{BackendPlaylist, PlayState};
use core_library::MemoryLibrary;
use core_playback::memory::MemoryPlayer;
use core_playback::{Player, QueuedBy, TrackMeta};
use core_runtime::events::PlayerEvent;
use std::sync::Arc;
use std::time::Duration;

fn player() -> MemoryPlayer {
    MemoryPlayer::new(Arc::new(MemoryLibrary::default()))
}

async fn fill(player: &MemoryPlayer, uris: &[&str]) {
    let tracks: Vec<Track> = uris.iter().map(|uri| Track::new(*uri)).collect();
    let metas = vec![TrackMeta::user(); tracks.len()];
    player.playlist().insert(None, tracks, metas).await.unwrap();
}

#[tokio::test]
async fn test_new_player_is_stopped_without_track() {
    let player = player();
    let status = player.status().await.unwrap();

    assert_eq!(status.state, PlayState::Stopped);
    assert_eq!(status.track_index, None);
    assert!(status.is_idle());
    assert!(player.available().await);
}

#[tokio::test]
async fn test_playing_empty_playlist_only_emits_state() {
    let player = player();
    let mut events = player.events().listen();

    player.set_state(PlayState::Playing).await.unwrap();

    assert_eq!(player.state().await.unwrap(), PlayState::Stopped);
    assert_eq!(
        events.try_recv(),
        Some(PlayerEvent::PlayStateChanged {
            state: PlayState::Stopped
        })
    );
}

#[tokio::test]
async fn test_stop_reports_state_once() {
    let player = player();
    fill(&player, &["a"]).await;
    player.set_state(PlayState::Playing).await.unwrap();
    let mut events = player.events().listen();

    player.set_state(PlayState::Stopped).await.unwrap();
    assert_eq!(
        events.try_recv(),
        Some(PlayerEvent::PlayStateChanged {
            state: PlayState::Stopped
        })
    );
    assert_eq!(events.try_recv(), None);

    // Already stopped: nothing changed, nothing to report.
    player.set_state(PlayState::Stopped).await.unwrap();
    assert_eq!(events.try_recv(), None);
}

#[tokio::test]
async fn test_play_starts_at_first_track() {
    let player = player();
    fill(&player, &["a", "b"]).await;

    player.set_state(PlayState::Playing).await.unwrap();

    assert_eq!(player.state().await.unwrap(), PlayState::Playing);
    assert_eq!(player.track_index().await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_index_past_end_stops_player() {
    let player = player();
    fill(&player, &["a", "b"]).await;
    player.set_state(PlayState::Playing).await.unwrap();

    player.set_track_index(1).await.unwrap();
    assert_eq!(player.track_index().await.unwrap(), Some(1));

    player.set_track_index(2).await.unwrap();
    assert_eq!(player.state().await.unwrap(), PlayState::Stopped);
    assert_eq!(player.track_index().await.unwrap(), None);
}

#[tokio::test]
async fn test_seek_while_stopped_is_ignored() {
    let player = player();
    fill(&player, &["a"]).await;

    player.set_time(Duration::from_secs(30)).await.unwrap();
    assert_eq!(player.time().await.unwrap(), Duration::ZERO);

    player.set_state(PlayState::Playing).await.unwrap();
    player.set_time(Duration::from_secs(30)).await.unwrap();
    assert_eq!(player.time().await.unwrap(), Duration::from_secs(30));
}

#[tokio::test]
async fn test_volume_is_clamped() {
    let player = player();

    player.set_volume(140).await.unwrap();
    assert_eq!(player.volume().await.unwrap(), 100);

    player.set_volume(-3).await.unwrap();
    assert_eq!(player.volume().await.unwrap(), 0);
}

#[tokio::test]
async fn test_offline_backend_fails_calls_but_not_probe() {
    let player = player();
    let mut events = player.events().listen();

    player.set_available(false);
    assert!(!player.available().await);
    assert!(player.state().await.unwrap_err().is_unavailable());
    assert!(player.playlist().tracks().await.is_err());
    assert_eq!(
        events.try_recv(),
        Some(PlayerEvent::AvailabilityChanged { available: false })
    );

    player.set_available(true);
    assert!(player.state().await.is_ok());
}

#[tokio::test]
async fn test_finishing_last_track_goes_idle() {
    let player = player();
    fill(&player, &["a", "b"]).await;
    player.set_state(PlayState::Playing).await.unwrap();

    player.finish_track().unwrap();
    assert_eq!(player.track_index().await.unwrap(), Some(1));

    player.finish_track().unwrap();
    let status = player.status().await.unwrap();
    assert_eq!(status.state, PlayState::Stopped);
    assert_eq!(status.track_index, None);
}

#[tokio::test]
async fn test_current_track_follows_playlist_edits() {
    let player = player();
    fill(&player, &["a", "b", "c"]).await;
    player.set_state(PlayState::Playing).await.unwrap();
    player.set_track_index(1).await.unwrap();

    player
        .playlist()
        .insert(Some(0), vec![Track::new("x")], vec![TrackMeta::user()])
        .await
        .unwrap();
    assert_eq!(player.track_index().await.unwrap(), Some(2));

    player.playlist().move_track(2, 0).await.unwrap();
    assert_eq!(player.track_index().await.unwrap(), Some(0));

    player.playlist().remove(&[0]).await.unwrap();
    assert_eq!(player.track_index().await.unwrap(), Some(0));
    assert_eq!(player.state().await.unwrap(), PlayState::Playing);
}

#[tokio::test]
async fn test_bare_playlist_changes_show_as_user_queued() {
    let player = player();
    player
        .playlist()
        .insert(None, vec![Track::new("mine")], vec![TrackMeta::system()])
        .await
        .unwrap();

    player
        .bare_playlist()
        .insert(Some(0), &[Track::new("theirs")])
        .await
        .unwrap();

    let meta = player.playlist().meta().await.unwrap();
    assert_eq!(meta[0].queued_by, QueuedBy::User);
    assert_eq!(meta[1].queued_by, QueuedBy::System);
}

#[tokio::test]
async fn test_playlist_mutations_emit_events() {
    let player = player();
    let mut events = player.events().listen();

    fill(&player, &["a"]).await;

    assert_eq!(
        events.recv().await,
        Some(PlayerEvent::PlaylistChanged { index: None })
    );
}
