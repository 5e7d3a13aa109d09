//! # Library Module
//!
//! Track catalogue plumbing on top of the [`Library`](bridge_traits::Library)
//! contract.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`TrackCache`](cache::TrackCache), a read-through cache with atomic snapshot swaps
//! - [`all_track_info`](lookup::all_track_info) for lookups across several libraries
//! - [`filter_tracks`](search::filter_tracks) and ranking for filter-based search
//! - [`MemoryLibrary`](memory::MemoryLibrary), an in-process catalogue

pub mod cache;
pub mod error;
pub mod lookup;
pub mod memory;
pub mod search;

pub use cache::{TrackCache, TrackSnapshot};
pub use error::{LibraryError, Result};
pub use lookup::all_track_info;
pub use memory::MemoryLibrary;
pub use search::{filter_tracks, rank_by_matches, SearchResult};
