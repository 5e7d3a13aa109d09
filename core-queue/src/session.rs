//! # AutoQueue Session
//!
//! Keeps a player busy by appending tracks that match a named filter
//! whenever the player goes idle.
//!
//! ## State Machine
//!
//! ```text
//! Building ──> Watching ──> Terminated
//!     │                        ↑
//!     └────────────────────────┘
//! ```
//!
//! - **Building**: evaluates the filter against the player's library and
//!   shuffles the matches into a [`CandidateRotation`]
//! - **Watching**: reacts to player and filter events until cancelled, out of
//!   candidates, or a backend call fails
//! - **Terminated**: the outcome is available from [`AutoQueueSession::done`]
//!
//! A player is idle when it is stopped or has no current track. On idle the
//! session appends the next candidate (marked [`QueuedBy::System`]), starts
//! playback and jumps to the appended slot.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let session = AutoQueue::start(player, filters, "rock", AutoQueueConfig::default())?;
//! // ...
//! session.cancel();
//! assert_eq!(session.done().await?, StopReason::Cancelled);
//! ```
//!
//! [`QueuedBy::System`]: core_playback::QueuedBy::System

use crate::error::{QueueError, Result};
use crate::filters::{FilterEvent, FilterStore};
use crate::rotation::CandidateRotation;
use bridge_traits::{Filter, PlayState};
use core_playback::{Player, TrackMeta};
use core_runtime::config::AutoQueueConfig;
use core_runtime::logging::redact_uri;
use core_runtime::{PlayerEvent, Subscription};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

// ============================================================================
// Types
// ============================================================================

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Building,
    Watching,
    Terminated,
}

/// Why a session stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    Cancelled,
    /// The player went idle and no candidate was left to queue.
    Exhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Final result of a session.
pub type SessionOutcome = Result<StopReason>;

// ============================================================================
// Session Handle
// ============================================================================

/// Entry point for auto-queue sessions.
pub struct AutoQueue;

impl AutoQueue {
    /// Start a session for `player` driven by the filter called `filter_name`.
    ///
    /// Player and filter subscriptions are registered before this returns, so
    /// no event emitted afterwards is missed. Must be called from inside a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::FilterNotFound`] if `filters` has no such filter.
    #[instrument(skip(player, filters, config))]
    pub fn start(
        player: Arc<dyn Player>,
        filters: Arc<FilterStore>,
        filter_name: &str,
        config: AutoQueueConfig,
    ) -> Result<AutoQueueSession> {
        let filter = filters.get(filter_name)?;

        let id = SessionId::new();
        let token = CancellationToken::new();
        let player_events = player
            .events()
            .listen_until(token.clone())
            .filter(PlayerEvent::affects_idle);
        let filter_events = filters.events().listen_until(token.clone());

        let (state_tx, state_rx) = watch::channel(SessionState::Building);
        let (outcome_tx, outcome_rx) = watch::channel(None);

        let rng = match config.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut task = SessionTask {
            player,
            filters,
            filter_name: filter_name.to_string(),
            rotation: CandidateRotation::empty(),
            rng,
            token: token.clone(),
        };

        let span = info_span!("autoqueue", session = %id, filter = filter_name);
        tokio::spawn(
            async move {
                let outcome = task
                    .run(filter, player_events, filter_events, &state_tx)
                    .await;
                match &outcome {
                    Ok(reason) => info!(%reason, "AutoQueue session stopped"),
                    Err(err) => error!(error = %err, "AutoQueue session failed"),
                }
                state_tx.send_replace(SessionState::Terminated);
                outcome_tx.send_replace(Some(outcome));
            }
            .instrument(span),
        );

        info!(session = %id, "AutoQueue session started");

        Ok(AutoQueueSession {
            id,
            filter_name: filter_name.to_string(),
            token,
            state: state_rx,
            outcome: outcome_rx,
        })
    }
}

/// Handle to a running session.
///
/// Clones observe the same session. Dropping every handle does not stop the
/// session; call [`cancel`](Self::cancel).
#[derive(Clone)]
pub struct AutoQueueSession {
    id: SessionId,
    filter_name: String,
    token: CancellationToken,
    state: watch::Receiver<SessionState>,
    outcome: watch::Receiver<Option<SessionOutcome>>,
}

impl AutoQueueSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn filter_name(&self) -> &str {
        &self.filter_name
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// Request a stop. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits until the session has finished building its rotation.
    pub async fn ready(&self) {
        let mut state = self.state.clone();
        // A closed channel means the task is gone, which also counts as ready.
        let _ = state.wait_for(|s| *s != SessionState::Building).await;
    }

    /// Waits for the session to end.
    ///
    /// Every caller gets the same outcome: `Ok` with the stop reason for
    /// clean stops, or the one error that ended the session.
    pub async fn done(&self) -> SessionOutcome {
        let mut outcome = self.outcome.clone();
        let result = match outcome.wait_for(Option::is_some).await {
            Ok(finished) => finished.clone().unwrap_or_else(|| {
                Err(QueueError::TaskLost("no outcome recorded".to_string()))
            }),
            Err(_) => Err(QueueError::TaskLost(
                "session task exited without reporting".to_string(),
            )),
        };
        result
    }
}

impl fmt::Debug for AutoQueueSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoQueueSession")
            .field("id", &self.id)
            .field("filter_name", &self.filter_name)
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// Session Task
// ============================================================================

struct SessionTask {
    player: Arc<dyn Player>,
    filters: Arc<FilterStore>,
    filter_name: String,
    rotation: CandidateRotation,
    rng: StdRng,
    token: CancellationToken,
}

impl SessionTask {
    async fn run(
        &mut self,
        filter: Arc<dyn Filter>,
        mut player_events: Subscription<PlayerEvent>,
        mut filter_events: Subscription<FilterEvent>,
        state: &watch::Sender<SessionState>,
    ) -> SessionOutcome {
        self.rebuild(filter.as_ref()).await?;
        state.send_replace(SessionState::Watching);

        let mut filters_open = true;
        loop {
            if self.token.is_cancelled() {
                return Ok(StopReason::Cancelled);
            }

            tokio::select! {
                biased;

                _ = self.token.cancelled() => return Ok(StopReason::Cancelled),

                event = filter_events.recv(), if filters_open => match event {
                    Some(event) => self.on_filter_event(event).await?,
                    None => filters_open = false,
                },

                event = player_events.recv() => match event {
                    Some(event) => {
                        debug!(event = %event.description(), "Player event");
                        if let Some(reason) = self.on_player_changed().await? {
                            return Ok(reason);
                        }
                    }
                    // Player bus is gone; nothing left to watch.
                    None => return Ok(StopReason::Cancelled),
                },
            }
        }
    }

    async fn on_filter_event(&mut self, event: FilterEvent) -> Result<()> {
        match event {
            FilterEvent::Updated { name } if name == self.filter_name => {
                match self.filters.get(&name) {
                    Ok(filter) => self.rebuild(filter.as_ref()).await?,
                    // Removed again before we got to it.
                    Err(_) => self.clear_rotation(),
                }
            }
            FilterEvent::Removed { name } if name == self.filter_name => self.clear_rotation(),
            _ => {}
        }
        Ok(())
    }

    async fn rebuild(&mut self, filter: &dyn Filter) -> Result<()> {
        let library = self.player.library().tracks().await?;
        self.rotation = CandidateRotation::build(filter, &library, &mut self.rng);
        info!(
            candidates = self.rotation.len(),
            library = library.len(),
            "Candidate rotation built"
        );
        Ok(())
    }

    fn clear_rotation(&mut self) {
        warn!("Filter removed, no more candidates will be queued");
        self.rotation = CandidateRotation::empty();
    }

    /// Queue the next candidate if the player is idle.
    async fn on_player_changed(&mut self) -> Result<Option<StopReason>> {
        let state = self.player.state().await?;
        let index = self.player.track_index().await?;
        if state != PlayState::Stopped && index.is_some() {
            return Ok(None);
        }

        if self.token.is_cancelled() {
            return Ok(Some(StopReason::Cancelled));
        }

        let Some(track) = self.rotation.next() else {
            return Ok(Some(StopReason::Exhausted));
        };

        info!(
            uri = %redact_uri(&track.uri),
            %state,
            "Player idle, queueing next candidate"
        );

        let playlist = self.player.playlist();
        playlist
            .insert(None, vec![track], vec![TrackMeta::system()])
            .await?;
        let len = playlist.len().await?;
        self.player.set_state(PlayState::Playing).await?;
        self.player.set_track_index(len.saturating_sub(1)).await?;
        Ok(None)
    }
}
