//! # Core Configuration Module
//!
//! Runtime settings for the jukebox core.
//!
//! ## Overview
//!
//! [`CoreConfig`] is assembled with [`CoreConfigBuilder`], which fills in
//! defaults and validates the result before handing it out. Components take
//! the narrow views they need ([`EventBusConfig`], [`AutoQueueConfig`]) rather
//! than the whole struct.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .event_capacity(256)
//!     .release_period(Duration::from_millis(250))
//!     .default_player("lounge")
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.event_bus().capacity, 256);
//! ```
//!
//! ## Error Handling
//!
//! Out-of-range values are rejected with [`Error::Config`] carrying an
//! actionable message:
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! CoreConfig::builder()
//!     .event_capacity(0)
//!     .build()
//!     .expect("Should fail - zero capacity");
//! ```

use crate::error::{Error, Result};
use std::time::Duration;

/// Per-subscriber queue length used when nothing else is configured.
pub const DEFAULT_EVENT_CAPACITY: usize = 128;

/// Coalescing window for player buses when nothing else is configured.
///
/// Backends that poll or receive push notifications tend to report the same
/// state several times in a row; one report per value per window is enough.
pub const DEFAULT_RELEASE_PERIOD: Duration = Duration::from_millis(100);

/// Upper bound on the coalescing window.
pub const MAX_RELEASE_PERIOD: Duration = Duration::from_secs(60);

/// Core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Queue length of every player event subscription
    pub event_capacity: usize,

    /// Coalescing window for repeated player events; zero disables it
    pub release_period: Duration,

    /// Queue length of filter store subscriptions
    pub filter_event_capacity: usize,

    /// Seed for candidate shuffling; `None` draws from OS entropy
    pub shuffle_seed: Option<u64>,

    /// Player selected when a caller does not name one
    pub default_player: Option<String>,
}

/// Settings for one [`EventBus`](crate::events::EventBus).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventBusConfig {
    pub capacity: usize,
    pub release_period: Duration,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_EVENT_CAPACITY,
            release_period: Duration::ZERO,
        }
    }
}

/// Settings for auto-queue sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoQueueConfig {
    pub shuffle_seed: Option<u64>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            release_period: DEFAULT_RELEASE_PERIOD,
            filter_event_capacity: DEFAULT_EVENT_CAPACITY,
            shuffle_seed: None,
            default_player: None,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - Event queue capacities are non-zero
    /// - The release period does not exceed [`MAX_RELEASE_PERIOD`]
    /// - A default player name, when set, is a valid player name
    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(Error::Config(
                "Event capacity must be greater than 0".to_string(),
            ));
        }

        if self.filter_event_capacity == 0 {
            return Err(Error::Config(
                "Filter event capacity must be greater than 0".to_string(),
            ));
        }

        if self.release_period > MAX_RELEASE_PERIOD {
            return Err(Error::Config(format!(
                "Release period of {:?} exceeds maximum of {:?}",
                self.release_period, MAX_RELEASE_PERIOD
            )));
        }

        if let Some(name) = &self.default_player {
            let valid = !name.is_empty()
                && name.chars().all(|c| c.is_alphanumeric() || c == '_');
            if !valid {
                return Err(Error::Config(format!(
                    "Default player name '{}' may only contain letters, digits and '_'",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Settings for player event buses.
    pub fn event_bus(&self) -> EventBusConfig {
        EventBusConfig {
            capacity: self.event_capacity,
            release_period: self.release_period,
        }
    }

    /// Settings for the filter store bus. Filter events are never coalesced.
    pub fn filter_event_bus(&self) -> EventBusConfig {
        EventBusConfig {
            capacity: self.filter_event_capacity,
            release_period: Duration::ZERO,
        }
    }

    /// Settings for control-plane buses such as the jukebox's own events.
    ///
    /// Same queue length as player buses, never coalesced: turning a feature
    /// off and on again must be reported twice.
    pub fn control_event_bus(&self) -> EventBusConfig {
        EventBusConfig {
            capacity: self.event_capacity,
            release_period: Duration::ZERO,
        }
    }

    pub fn autoqueue(&self) -> AutoQueueConfig {
        AutoQueueConfig {
            shuffle_seed: self.shuffle_seed,
        }
    }
}

/// Builder for [`CoreConfig`].
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    event_capacity: Option<usize>,
    release_period: Option<Duration>,
    filter_event_capacity: Option<usize>,
    shuffle_seed: Option<u64>,
    default_player: Option<String>,
}

impl CoreConfigBuilder {
    /// Sets the per-subscriber queue length for player events.
    ///
    /// Default: 128
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    /// Sets the coalescing window for repeated player events.
    ///
    /// Default: [`DEFAULT_RELEASE_PERIOD`]. Zero delivers every emit.
    pub fn release_period(mut self, period: Duration) -> Self {
        self.release_period = Some(period);
        self
    }

    pub fn filter_event_capacity(mut self, capacity: usize) -> Self {
        self.filter_event_capacity = Some(capacity);
        self
    }

    /// Fixes the shuffle seed so candidate rotations are reproducible.
    pub fn shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn default_player(mut self, name: impl Into<String>) -> Self {
        self.default_player = Some(name.into());
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<CoreConfig> {
        let defaults = CoreConfig::default();
        let config = CoreConfig {
            event_capacity: self.event_capacity.unwrap_or(defaults.event_capacity),
            release_period: self.release_period.unwrap_or(defaults.release_period),
            filter_event_capacity: self
                .filter_event_capacity
                .unwrap_or(defaults.filter_event_capacity),
            shuffle_seed: self.shuffle_seed,
            default_player: self.default_player,
        };

        config.validate()?;
        Ok(config)
    }
}
