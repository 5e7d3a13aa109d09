//! # Queue Module
//!
//! Named filters and the AutoQueue controller.
//!
//! ## Overview
//!
//! - [`FilterStore`]: shared, named [`Filter`](bridge_traits::Filter) objects
//!   with change events
//! - [`CandidateRotation`]: shuffled matches handed out round-robin
//! - [`AutoQueue`]: starts [`AutoQueueSession`]s that append a matching track
//!   whenever a player goes idle

pub mod error;
pub mod filters;
pub mod rotation;
pub mod session;

pub use error::{QueueError, Result};
pub use filters::{validate_filter_name, FilterEvent, FilterStore};
pub use rotation::CandidateRotation;
pub use session::{AutoQueue, AutoQueueSession, SessionId, SessionOutcome, SessionState, StopReason};
