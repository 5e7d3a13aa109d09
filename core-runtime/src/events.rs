//! # Event Bus System
//!
//! Typed publish/subscribe hub built on `tokio::sync::broadcast`, with
//! per-value burst coalescing.
//!
//! ## Overview
//!
//! - **[`EventBus`]**: cloneable handle to one hub; every clone emits into the same channel
//! - **[`Subscription`]**: one listener with its own bounded queue
//! - **[`PlayerEvent`]**: facts reported by a player backend
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     emit      ┌────────────┐   listen    ┌──────────────┐
//! │   Backend   ├──────────────>│  release   │────────────>│ Subscription │
//! │   adapter   │               │  windows   │             └──────────────┘
//! └─────────────┘               │     +      │   listen    ┌──────────────┐
//! ┌─────────────┐     emit      │ broadcast  │────────────>│ Subscription │
//! │  Playlist   ├──────────────>│  channel   │             └──────────────┘
//! └─────────────┘               └────────────┘
//! ```
//!
//! ## Coalescing
//!
//! With a non-zero release period `R`, the first emit of a value delivers
//! immediately and opens a window of `R` for that value. Equal values emitted
//! while the window is open are dropped. The first emit after the window
//! closes delivers again and opens a new window. Distinct values never
//! suppress each other.
//!
//! ## Backpressure
//!
//! Emitters never block. Each subscription buffers up to `capacity` events;
//! when a subscriber falls further behind, the oldest events are dropped and
//! the subscriber skips ahead, counting the loss in [`Subscription::missed`].
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{Emission, EventBus, PlayerEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut sub = bus.listen();
//!
//! assert_eq!(bus.emit(PlayerEvent::LibraryChanged), Emission::Delivered(1));
//! assert_eq!(sub.recv().await, Some(PlayerEvent::LibraryChanged));
//! # }
//! ```

use crate::config::{EventBusConfig, DEFAULT_EVENT_CAPACITY};
use bridge_traits::PlayState;
use futures::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{trace, warn};

// ============================================================================
// Player Events
// ============================================================================

/// Facts about backend state. Never commands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// Playlist contents or the current index changed. `None` means no track.
    PlaylistChanged { index: Option<usize> },
    PlayStateChanged { state: PlayState },
    TimeChanged { offset: Duration },
    VolumeChanged { level: u8 },
    AvailabilityChanged { available: bool },
    LibraryChanged,
}

impl PlayerEvent {
    pub fn description(&self) -> String {
        match self {
            PlayerEvent::PlaylistChanged { index: Some(i) } => {
                format!("Playlist changed (current track {})", i)
            }
            PlayerEvent::PlaylistChanged { index: None } => {
                "Playlist changed (no current track)".to_string()
            }
            PlayerEvent::PlayStateChanged { state } => format!("Play state is now {}", state),
            PlayerEvent::TimeChanged { offset } => {
                format!("Playback position at {:.1}s", offset.as_secs_f64())
            }
            PlayerEvent::VolumeChanged { level } => format!("Volume set to {}", level),
            PlayerEvent::AvailabilityChanged { available: true } => {
                "Backend became available".to_string()
            }
            PlayerEvent::AvailabilityChanged { available: false } => {
                "Backend became unavailable".to_string()
            }
            PlayerEvent::LibraryChanged => "Library contents changed".to_string(),
        }
    }

    /// True for events that can move a player into or out of the idle state.
    pub fn affects_idle(&self) -> bool {
        matches!(
            self,
            PlayerEvent::PlaylistChanged { .. } | PlayerEvent::PlayStateChanged { .. }
        )
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Result of a single [`EventBus::emit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    /// Queued for this many subscribers.
    Delivered(usize),
    /// Suppressed by an open release window for an equal value.
    Coalesced,
    /// Nobody was listening. The release window is still opened.
    NoSubscribers,
}

struct ReleaseWindows<E> {
    opened: HashMap<E, Instant>,
    last_prune: Instant,
}

struct Inner<E> {
    sender: broadcast::Sender<E>,
    release: Duration,
    windows: Mutex<ReleaseWindows<E>>,
}

/// Broadcast hub for events of type `E`.
///
/// Cloning is cheap and yields a handle to the same hub.
pub struct EventBus<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> EventBus<E>
where
    E: Clone + Eq + Hash + Send + Sync + 'static,
{
    /// Creates a bus without coalescing.
    ///
    /// `capacity` is the per-subscriber queue length; zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self::with_config(EventBusConfig {
            capacity,
            release_period: Duration::ZERO,
        })
    }

    /// Creates a bus that coalesces equal values inside `release`.
    pub fn with_release(capacity: usize, release: Duration) -> Self {
        Self::with_config(EventBusConfig {
            capacity,
            release_period: release,
        })
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                sender,
                release: config.release_period,
                windows: Mutex::new(ReleaseWindows {
                    opened: HashMap::new(),
                    last_prune: Instant::now(),
                }),
            }),
        }
    }

    /// Publishes an event to every live subscription.
    pub fn emit(&self, event: E) -> Emission {
        if !self.admit(&event) {
            trace!("Event coalesced inside release window");
            return Emission::Coalesced;
        }

        match self.inner.sender.send(event) {
            Ok(receivers) => Emission::Delivered(receivers),
            Err(_) => Emission::NoSubscribers,
        }
    }

    /// Opens a release window for `event` unless one is already open.
    fn admit(&self, event: &E) -> bool {
        let release = self.inner.release;
        if release.is_zero() {
            return true;
        }

        let now = Instant::now();
        let mut windows = self.inner.windows.lock();

        if let Some(opened) = windows.opened.get(event) {
            if now.duration_since(*opened) < release {
                return false;
            }
        }

        if now.duration_since(windows.last_prune) >= release {
            windows
                .opened
                .retain(|_, opened| now.duration_since(*opened) < release);
            windows.last_prune = now;
        }

        windows.opened.insert(event.clone(), now);
        true
    }

    /// Registers a new subscription. Past events are not replayed.
    pub fn listen(&self) -> Subscription<E> {
        Subscription {
            receiver: Arc::new(tokio::sync::Mutex::new(Some(self.inner.sender.subscribe()))),
            cancel: None,
            _watch: None,
            filter: None,
            missed: 0,
        }
    }

    /// Registers a subscription that ends when `token` is cancelled.
    ///
    /// The subscription is unregistered as soon as the token fires, whether
    /// or not its holder is waiting in [`Subscription::recv`]. Outside a tokio
    /// runtime the queue is released on the holder's next receive instead.
    pub fn listen_until(&self, token: CancellationToken) -> Subscription<E> {
        let mut subscription = self.listen();

        match Handle::try_current() {
            Ok(handle) => {
                let slot = Arc::downgrade(&subscription.receiver);
                let dropped = CancellationToken::new();
                let watched = dropped.clone();
                let cancelled = token.clone();
                handle.spawn(async move {
                    tokio::select! {
                        _ = cancelled.cancelled() => {
                            if let Some(slot) = slot.upgrade() {
                                slot.lock().await.take();
                                trace!("Cancelled subscription unregistered");
                            }
                        }
                        _ = watched.cancelled() => {}
                    }
                });
                subscription._watch = Some(dropped.drop_guard());
            }
            Err(_) => trace!("No runtime; cancelled subscription released lazily"),
        }

        subscription.cancel = Some(token);
        subscription
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }

    pub fn release_period(&self) -> Duration {
        self.inner.release
    }

    #[cfg(test)]
    fn open_windows(&self) -> usize {
        self.inner.windows.lock().opened.len()
    }
}

impl<E> Default for EventBus<E>
where
    E: Clone + Eq + Hash + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.inner.sender.receiver_count())
            .field("release", &self.inner.release)
            .finish()
    }
}

// ============================================================================
// Subscription
// ============================================================================

type EventFilter<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;
type ReceiverSlot<E> = Arc<tokio::sync::Mutex<Option<broadcast::Receiver<E>>>>;

/// One listener on an [`EventBus`].
///
/// Dropping the subscription (or calling [`unlisten`](Self::unlisten))
/// unregisters it immediately.
pub struct Subscription<E> {
    // Shared with the cancellation watcher, which empties it when the token fires.
    receiver: ReceiverSlot<E>,
    cancel: Option<CancellationToken>,
    // Stops the cancellation watcher once the subscription is dropped.
    _watch: Option<DropGuard>,
    filter: Option<EventFilter<E>>,
    missed: u64,
}

impl<E: Clone> Subscription<E> {
    /// Only yield events matching `predicate`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once the bus is gone or the subscription's cancellation
    /// token fired; every later call returns `None` as well.
    pub async fn recv(&mut self) -> Option<E> {
        let shared = Arc::clone(&self.receiver);
        let mut slot = shared.lock().await;

        loop {
            let receiver = slot.as_mut()?;
            let received = match &self.cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    result = receiver.recv() => Some(result),
                },
                None => Some(receiver.recv().await),
            };

            match received {
                Some(Ok(event)) => {
                    if self.accepts(&event) {
                        return Some(event);
                    }
                }
                Some(Err(RecvError::Lagged(skipped))) => self.record_lag(skipped),
                Some(Err(RecvError::Closed)) | None => {
                    slot.take();
                    return None;
                }
            }
        }
    }

    /// Returns a queued event without waiting.
    pub fn try_recv(&mut self) -> Option<E> {
        let shared = Arc::clone(&self.receiver);
        // Only the cancellation watcher contends for the slot, and it is
        // about to empty it.
        let mut slot = shared.try_lock().ok()?;

        if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
            slot.take();
            return None;
        }

        loop {
            let receiver = slot.as_mut()?;
            match receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(event);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => {
                    slot.take();
                    return None;
                }
            }
        }
    }

    /// Adapts the subscription into a `Stream` for push endpoints.
    pub fn into_stream(self) -> impl Stream<Item = E>
    where
        E: Send + 'static,
    {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription
                .recv()
                .await
                .map(|event| (event, subscription))
        })
    }

    fn accepts(&self, event: &E) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    fn record_lag(&mut self, skipped: u64) {
        self.missed += skipped;
        warn!(skipped, "Subscriber fell behind; oldest events dropped");
    }
}

impl<E> Subscription<E> {
    /// Unregisters the subscription.
    pub fn unlisten(self) {}

    pub fn is_active(&self) -> bool {
        self.receiver
            .try_lock()
            .map_or(false, |slot| slot.is_some())
    }

    /// Number of events dropped because this subscriber fell behind.
    pub fn missed(&self) -> u64 {
        self.missed
    }
}

impl<E> fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .field("has_filter", &self.filter.is_some())
            .field("missed", &self.missed)
            .finish()
    }
}
