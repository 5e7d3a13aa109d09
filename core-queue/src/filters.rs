//! # Filter Store
//!
//! Named, shared filters with change notifications.
//!
//! ## Overview
//!
//! The store is an explicit object created at start-up and handed around by
//! `Arc`. Every change is announced on the store's own [`EventBus`]:
//!
//! - `set` emits [`FilterEvent::Updated`], plus [`FilterEvent::ListChanged`]
//!   when the name is new
//! - `remove` emits [`FilterEvent::Removed`] and [`FilterEvent::ListChanged`]
//!
//! Events are emitted after the lock is released, so a listener that reacts
//! by calling [`FilterStore::get`] sees the new state.

use crate::error::{QueueError, Result};
use bridge_traits::{Filter, FilterKind};
use core_runtime::config::EventBusConfig;
use core_runtime::EventBus;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Change notification for a [`FilterStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FilterEvent {
    Updated { name: String },
    Removed { name: String },
    /// The set of names changed.
    ListChanged,
}

impl FilterEvent {
    /// Name of the filter this event is about, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            FilterEvent::Updated { name } | FilterEvent::Removed { name } => Some(name),
            FilterEvent::ListChanged => None,
        }
    }
}

/// Reject names that cannot be used as store keys.
pub fn validate_filter_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') {
        return Err(QueueError::InvalidFilterName(name.to_string()));
    }
    Ok(())
}

/// In-memory named filter store.
pub struct FilterStore {
    filters: RwLock<BTreeMap<String, Arc<dyn Filter>>>,
    events: EventBus<FilterEvent>,
}

impl FilterStore {
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        Self {
            filters: RwLock::new(BTreeMap::new()),
            events: EventBus::with_config(config),
        }
    }

    /// Look up a filter by name.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::FilterNotFound`] for unknown names.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Filter>> {
        self.filters
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| QueueError::FilterNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.read().contains_key(name)
    }

    /// Store `filter` under `name`, replacing any previous filter.
    pub fn set(&self, name: &str, filter: Arc<dyn Filter>) -> Result<()> {
        validate_filter_name(name)?;

        let kind = filter.kind();
        let is_new = self
            .filters
            .write()
            .insert(name.to_string(), filter)
            .is_none();

        info!(filter = name, ?kind, is_new, "Filter stored");
        self.events.emit(FilterEvent::Updated {
            name: name.to_string(),
        });
        if is_new {
            self.events.emit(FilterEvent::ListChanged);
        }
        Ok(())
    }

    /// Delete the filter called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::FilterNotFound`] if nothing is stored under `name`.
    pub fn remove(&self, name: &str) -> Result<()> {
        if self.filters.write().remove(name).is_none() {
            return Err(QueueError::FilterNotFound(name.to_string()));
        }

        info!(filter = name, "Filter removed");
        self.events.emit(FilterEvent::Removed {
            name: name.to_string(),
        });
        self.events.emit(FilterEvent::ListChanged);
        Ok(())
    }

    /// Stored names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.filters.read().keys().cloned().collect()
    }

    /// Stored names with their filter kinds, sorted by name.
    pub fn kinds(&self) -> Vec<(String, FilterKind)> {
        self.filters
            .read()
            .iter()
            .map(|(name, filter)| (name.clone(), filter.kind()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.filters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.read().is_empty()
    }

    pub fn events(&self) -> &EventBus<FilterEvent> {
        &self.events
    }
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterStore")
            .field("names", &self.names())
            .finish()
    }
}
