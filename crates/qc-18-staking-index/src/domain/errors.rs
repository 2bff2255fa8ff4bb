//! # Domain Errors
//!
//! Error types for the Contract Staking Index subsystem.
//!
//! A block is the unit of failure: every error raised while applying a block
//! discards the block's dirty cache and write batch, so the same block can be
//! fed again from the unmodified prior state.

use super::entities::{Address, BucketTypeKey};
use super::value_objects::ConfigError;
use thiserror::Error;

/// Errors raised by the staking index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StakingIndexError {
    /// A contract log could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An event referenced a bucket that is not live in the current snapshot.
    #[error("bucket {token_id} does not exist")]
    BucketNotFound { token_id: u64 },

    /// A bucket referenced a bucket type id that is unknown.
    #[error("bucket type {type_id} does not exist")]
    BucketTypeNotFound { type_id: u64 },

    /// No bucket type was ever activated for this (amount, duration).
    #[error("bucket type does not exist: amount {}, duration {}", .key.amount, .key.duration)]
    BucketTypeKeyNotFound { key: BucketTypeKey },

    /// `Staked` carried a token id at or below one already allocated.
    #[error("bucket id {token_id} reused, ids up to {highest} are spent")]
    BucketIdReused { token_id: u64, highest: u64 },

    /// The key-value store failed.
    #[error("storage error: {0}")]
    Storage(#[from] KVStoreError),

    /// A persisted record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// The block feed skipped ahead of the checkpoint.
    #[error("invalid block height {actual}, expected {expected}")]
    Continuity { expected: u64, actual: u64 },

    /// The store was built for a different contract.
    #[error("store indexes contract {stored}, configured contract is {configured}")]
    ContractMismatch { stored: Address, configured: Address },

    /// A read asked for a height the index does not hold.
    #[error("height {requested} is not indexed, tip is {tip:?}")]
    HeightNotIndexed { requested: u64, tip: Option<u64> },

    /// The indexer configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The indexer was used before `start` or after `stop`.
    #[error("staking indexer is not started")]
    NotStarted,
}

impl StakingIndexError {
    /// Returns true if the error means an event referenced state that the
    /// snapshot does not contain.
    #[must_use]
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Self::BucketNotFound { .. }
                | Self::BucketTypeNotFound { .. }
                | Self::BucketTypeKeyNotFound { .. }
                | Self::BucketIdReused { .. }
        )
    }
}

/// Key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },

    /// Key not found.
    #[error("key not found in KV store")]
    NotFound,

    /// The namespace has never been written.
    #[error("namespace {namespace} not found in KV store")]
    NamespaceNotFound { namespace: &'static str },
}

/// ABI decoding errors for contract logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Indexed parameter count does not match the topics.
    #[error("event {event}: expected {expected} topics, got {actual}")]
    TopicCountMismatch {
        event: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Topics or data do not match the event's ABI layout.
    #[error("event {event}: {reason}")]
    InvalidData { event: &'static str, reason: String },

    /// A decoded field has an unexpected type or value.
    #[error("field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Record encoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("serialization error: {message}")]
pub struct SerializationError {
    pub message: String,
}

impl SerializationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Violation of the bucket/candidate index invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexInconsistency {
    /// A live bucket is missing from its candidate's set.
    #[error("bucket {token_id} missing from candidate index")]
    MissingFromIndex { token_id: u64 },

    /// The candidate index lists an id that is not live or under another candidate.
    #[error("candidate index lists stale bucket {token_id}")]
    StaleIndexEntry { token_id: u64 },

    /// A candidate set is present but empty.
    #[error("empty candidate set left in index")]
    EmptyCandidateSet,

    /// (amount, duration) -> id does not round-trip through id -> bucket type.
    #[error("bucket type key index disagrees for type {type_id}")]
    BucketTypeKeyMismatch { type_id: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StakingIndexError::Continuity {
            expected: 10,
            actual: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("expected 10"));
    }

    #[test]
    fn test_kv_error_conversion() {
        let kv_err = KVStoreError::IOError {
            message: "disk failure".to_string(),
        };
        let err: StakingIndexError = kv_err.into();

        match err {
            StakingIndexError::Storage(KVStoreError::IOError { message }) => {
                assert!(message.contains("disk failure"));
            }
            other => panic!("Expected Storage error, got {other:?}"),
        }
    }

    #[test]
    fn test_integrity_classification() {
        assert!(StakingIndexError::BucketNotFound { token_id: 1 }.is_integrity_violation());
        assert!(!StakingIndexError::NotStarted.is_integrity_violation());
        assert!(!StakingIndexError::Decode(DecodeError::InvalidData {
            event: "Staked",
            reason: "buffer overrun".to_string(),
        })
        .is_integrity_violation());
    }
}
