//! Jukebox facade and bootstrap helpers.
//!
//! This crate wires host-provided pieces (player backends, extra track
//! libraries, the filter store and configuration) into one [`Jukebox`]
//! object. Host surfaces such as an HTTP API or a CLI call into the facade by
//! player name and subscribe to its events; they never touch the lower
//! crates directly.

pub mod error;
pub mod jukebox;

pub use error::{Result, ServiceError};
pub use jukebox::{InsertAt, Jukebox, JukeboxEvent};

use std::sync::Arc;

use bridge_traits::Library;
use core_playback::PlayerList;
use core_queue::FilterStore;
use core_runtime::config::CoreConfig;

/// Aggregated handle to everything the jukebox needs from its host.
pub struct JukeboxDependencies {
    pub players: PlayerList,
    pub filters: Arc<FilterStore>,
    /// Consulted before each player's own library for track details and art.
    pub extra_libraries: Vec<Arc<dyn Library>>,
    pub config: CoreConfig,
}

impl JukeboxDependencies {
    /// Construct a dependency bundle with an empty filter store, no extra
    /// libraries and default configuration.
    pub fn new(players: PlayerList) -> Self {
        let config = CoreConfig::default();
        Self {
            players,
            filters: Arc::new(FilterStore::with_config(config.filter_event_bus())),
            extra_libraries: Vec::new(),
            config,
        }
    }

    pub fn with_filters(mut self, filters: Arc<FilterStore>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_library(mut self, library: Arc<dyn Library>) -> Self {
        self.extra_libraries.push(library);
        self
    }

    pub fn with_config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }
}

/// Build a [`Jukebox`] from explicit dependencies.
///
/// ```
/// # async fn example() -> core_service::Result<()> {
/// use core_library::MemoryLibrary;
/// use core_playback::memory::MemoryPlayer;
/// use core_playback::PlayerList;
/// use core_service::{bootstrap, JukeboxDependencies};
/// use std::sync::Arc;
///
/// let player = Arc::new(MemoryPlayer::new(Arc::new(MemoryLibrary::default())));
/// let players = PlayerList::new().with_player("default", player)?;
/// let jukebox = bootstrap(JukeboxDependencies::new(players))?;
/// assert_eq!(jukebox.default_player().as_deref(), Some("default"));
/// # Ok(())
/// # }
/// ```
pub fn bootstrap(deps: JukeboxDependencies) -> Result<Jukebox> {
    Jukebox::new(deps)
}
