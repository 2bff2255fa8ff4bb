//! # Outbound Ports (Driven Ports)
//!
//! Dependencies required by the staking indexer.
//!
//! Production: `RocksDbStore` (behind the `rocksdb` feature)
//! Testing: `InMemoryKVStore`

use crate::domain::block::ReceiptLog;
use crate::domain::errors::{DecodeError, KVStoreError};
use crate::domain::events::ContractEvent;
use crate::domain::value_objects::Namespace;

/// Key/value pairs returned by a namespace scan, in ascending key order.
pub type ScanResult = Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError>;

/// Abstract interface for a namespaced key-value database.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, namespace: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Put a single key-value pair.
    fn put(&mut self, namespace: Namespace, key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;

    /// Delete a key.
    fn delete(&mut self, namespace: Namespace, key: &[u8]) -> Result<(), KVStoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch succeed, or NONE are applied.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError>;

    /// All pairs of a namespace.
    ///
    /// Returns `NamespaceNotFound` if the namespace has never been written.
    fn scan(&self, namespace: Namespace) -> ScanResult;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put {
        namespace: Namespace,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    /// Delete a key.
    Delete { namespace: Namespace, key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(namespace: Namespace, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            namespace,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(namespace: Namespace, key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete {
            namespace,
            key: key.into(),
        }
    }

    pub fn namespace(&self) -> Namespace {
        match self {
            BatchOperation::Put { namespace, .. } | BatchOperation::Delete { namespace, .. } => {
                *namespace
            }
        }
    }
}

/// Decodes raw contract logs into staking events.
///
/// A log whose signature is unknown decodes to
/// [`ContractEvent::Unrecognized`]; only malformed logs of known events fail.
pub trait EventDecoder: Send + Sync {
    fn decode(&self, log: &ReceiptLog) -> Result<ContractEvent, DecodeError>;
}
