pub mod collect;
pub mod review;

// Re-export command functions for convenience
pub use collect::{collect, CollectArgs};
pub use review::{decide, review, search, stats, Decision};
