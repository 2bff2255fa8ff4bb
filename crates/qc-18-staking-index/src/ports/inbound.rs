//! # Inbound Ports (Driving Ports)
//!
//! The generic block-indexer contract the node's indexing pipeline drives.

use crate::domain::block::IndexedBlock;
use crate::domain::errors::StakingIndexError;

/// A component fed one block at a time, in height order.
pub trait BlockIndexer: Send + Sync {
    /// Load persisted state. Calling it again is a no-op.
    fn start(&self) -> Result<(), StakingIndexError>;

    /// Stop accepting blocks and queries.
    fn stop(&self) -> Result<(), StakingIndexError>;

    /// Apply a block.
    ///
    /// Re-feeding an already committed height succeeds without effect; a
    /// height beyond the next expected one fails with
    /// [`StakingIndexError::Continuity`].
    fn put_block(&self, block: &IndexedBlock) -> Result<(), StakingIndexError>;

    /// Last committed height, or `start_height - 1` before the first commit.
    fn height(&self) -> Result<u64, StakingIndexError>;

    /// Height at which indexing begins.
    fn start_height(&self) -> u64;
}
