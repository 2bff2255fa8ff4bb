//! # Contract Staking Index (qc-18)
//!
//! A read-side projection of a staking contract's events. The indexer watches
//! one contract's logs block by block, decodes them into bucket types and
//! bucket instances, and keeps a persisted, queryable snapshot that survives
//! restarts.
//!
//! ## Architecture
//!
//! ```text
//! Block feed ──IndexedBlock──→ StakingIndexer ──decode──→ EventHandler
//!                                   │                    (cache copy + batch)
//!                                   │←──────finalize──────────┘
//!                                   ↓
//!                  [atomic batch: records + checkpoint]
//!                                   ↓
//!                       [swap shared snapshot]
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Exactly-once | A committed height is never applied twice; gaps are rejected |
//! | 2 | Atomic commit | Records and checkpoint share one write batch |
//! | 3 | Snapshot isolation | Readers see whole blocks only |
//! | 4 | Index consistency | Candidate sets partition the live buckets |
//! | 5 | Type dedup | One id per (amount, duration), reused on reactivation |
//! | 6 | Burn irreversibility | Burned ids never come back |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Entities, events, cache, checkpoint, record codec
//! - `ports/` - `BlockIndexer` (inbound), `KeyValueStore` / `EventDecoder` (outbound)
//! - `adapters/` - In-memory and RocksDB stores, staking ABI decoder
//! - `service/` - Event handler, indexer, snapshot views
//!
//! ## Usage
//!
//! ```rust
//! use qc_18_staking_index::{
//!     Address, InMemoryKVStore, IndexedBlock, StakingIndexConfig, StakingIndexer,
//! };
//!
//! let config = StakingIndexConfig::new(Address::new([0x11; 20]), 100);
//! let indexer = StakingIndexer::new(config, InMemoryKVStore::new())?;
//! indexer.start()?;
//!
//! indexer.put_block(&IndexedBlock::new(100, 1_700_000_000, vec![]))?;
//! assert_eq!(indexer.height()?, 100);
//! assert_eq!(indexer.total_bucket_count()?, 0);
//! # Ok::<(), qc_18_staking_index::StakingIndexError>(())
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::{InMemoryKVStore, StakingAbiDecoder};
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStore};
pub use domain::{
    Address, Bucket, BucketType, BucketTypeKey, Candidate, ConfigError, ContractEvent,
    DecodeError, IndexInconsistency, IndexedBlock, KVStoreError, Receipt, ReceiptLog,
    ReceiptStatus, StakingCache, StakingIndexConfig, StakingIndexError, VoteBucket, U256,
};
pub use ports::{BatchOperation, BlockIndexer, EventDecoder, KeyValueStore};
pub use service::{EventHandler, IndexStats, StakingIndexer, StakingView};
