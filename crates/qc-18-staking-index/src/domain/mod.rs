//! # Domain Layer
//!
//! Bucket/bucket-type model and the snapshot the indexer serves reads from.
//!
//! ## Modules
//!
//! - `entities` - Bucket, BucketType, VoteBucket and their primitives
//! - `events` - Decoded staking contract events
//! - `block` - Blocks, receipts and logs as the feed delivers them
//! - `candidate_index` - Candidate -> bucket ids multimap
//! - `cache` - In-memory snapshot with secondary indexes
//! - `checkpoint` - Persisted height and block continuity
//! - `codec` - Versioned record encoding
//! - `value_objects` - Configuration and key layout
//! - `errors` - Domain error types

pub mod block;
pub mod cache;
pub mod candidate_index;
pub mod checkpoint;
pub mod codec;
pub mod entities;
pub mod errors;
pub mod events;
pub mod value_objects;

pub use block::{IndexedBlock, Receipt, ReceiptLog, ReceiptStatus};
pub use cache::StakingCache;
pub use candidate_index::CandidateIndex;
pub use checkpoint::{Checkpoint, Continuity};
pub use entities::{
    Address, Bucket, BucketType, BucketTypeKey, Candidate, Hash, Timestamp, VoteBucket, U256,
};
pub use errors::{
    DecodeError, IndexInconsistency, KVStoreError, SerializationError, StakingIndexError,
};
pub use events::ContractEvent;
pub use value_objects::{ConfigError, Namespace, StakingIndexConfig};
