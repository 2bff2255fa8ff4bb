//! # Staking Index Service
//!
//! Block ingest and snapshot reads.
//!
//! ```text
//! block -> contract logs -> decode -> EventHandler (cache copy + batch)
//!       -> atomic batch write (data + checkpoint) -> swap snapshot
//! ```

mod handler;
mod indexer;
mod view;

pub use handler::EventHandler;
pub use indexer::StakingIndexer;
pub use view::{IndexStats, StakingView};
