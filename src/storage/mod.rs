//! Persistence for collected articles
//!
//! Records produced by a collection run are queued for human review in a
//! SQLite table; see [`queue`].

pub mod queue;

pub use queue::{NewsQueue, QueueItem, QueueStats, QueueStatus, SEARCH_LIMIT};
