//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by every jukebox crate:
//! - Logging and tracing setup
//! - Configuration
//! - The event bus used for player notifications and store changes
//!
//! ## Overview
//!
//! Nothing in here knows about playlists or players beyond the event
//! vocabulary; higher crates build on these pieces.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{Emission, EventBus, PlayerEvent, Subscription};
