//! newsgate - configuration-driven news collector
//!
//! Scrapes articles from arbitrary HTML news sites described in a sites file
//! and queues them for human review before publication.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and site definitions
//! - [`crawler`] - Link discovery, politeness and the collection run
//! - [`parser`] - Article extraction, date parsing and text cleanup
//! - [`models`] - Core data structures and types
//! - [`storage`] - SQLite moderation queue
//! - [`scheduler`] - Publication slot helpers
//! - [`utils`] - Common utilities and domain errors
//!
//! # Example
//!
//! ```no_run
//! use newsgate::config::{load_sites, Config};
//! use newsgate::crawler::{CollectOptions, Collector};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let sites = load_sites(&config.collection.sites_path)?;
//!     let options = CollectOptions::from_config(&config.collection)?;
//!
//!     let collector = Collector::from_config(&config)?;
//!     let outcome = collector.collect(&sites, &options).await;
//!     println!("collected {}", outcome.records.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod parser;
pub mod scheduler;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, SiteConfig};
    pub use crate::crawler::{CollectOptions, CollectOutcome, Collector};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{ArticleRecord, CollectStats};
    pub use crate::storage::{NewsQueue, QueueStatus};
}

// Direct re-exports for convenience
pub use models::{ArticleRecord, CollectStats};
