//! Test utilities for the staking index.
//!
//! ABI log encoding for staking events, block builders and a key-value store
//! with switchable write failures. Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use qc_18_staking_index::test_utils::{staking_log, BlockBuilder};
//! use qc_18_staking_index::{Address, ContractEvent, U256};
//!
//! let contract = Address::new([0x11; 20]);
//! let block = BlockBuilder::new(10)
//!     .tx(vec![staking_log(
//!         contract,
//!         &ContractEvent::BucketTypeActivated {
//!             amount: U256::from(1000u64),
//!             duration: 100,
//!         },
//!     )])
//!     .build();
//! assert_eq!(block.receipts.len(), 1);
//! ```

use crate::adapters::abi;
use crate::adapters::memory::InMemoryKVStore;
use crate::domain::block::{IndexedBlock, Receipt, ReceiptLog};
use crate::domain::entities::{Address, Candidate, Hash, Timestamp, U256};
use crate::domain::errors::KVStoreError;
use crate::domain::events::ContractEvent;
use crate::domain::value_objects::Namespace;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use alloy_primitives::FixedBytes;
use alloy_sol_types::SolEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Block timestamp used by [`BlockBuilder`] for height `h`.
pub fn block_timestamp(height: u64) -> Timestamp {
    1_700_000_000 + height * 5
}

// =============================================================================
// LOG ENCODING
// =============================================================================

fn uint(v: u64) -> alloy_primitives::U256 {
    alloy_primitives::U256::from(v)
}

fn amount(v: U256) -> alloy_primitives::U256 {
    let mut word = [0u8; 32];
    v.to_big_endian(&mut word);
    alloy_primitives::U256::from_be_bytes(word)
}

fn bytes12(c: &Candidate) -> FixedBytes<12> {
    FixedBytes(*c.as_bytes())
}

fn address(a: &Address) -> alloy_primitives::Address {
    alloy_primitives::Address::from(*a.as_bytes())
}

fn to_log<E: SolEvent>(contract: Address, event: &E) -> ReceiptLog {
    let encoded = event.encode_log_data();
    ReceiptLog::new(
        contract,
        encoded.topics().iter().map(|t| t.0).collect(),
        encoded.data.to_vec(),
    )
}

/// ABI-encode `event` as a log emitted by `contract`.
///
/// # Panics
///
/// On [`ContractEvent::Unrecognized`], which has no signature.
pub fn staking_log(contract: Address, event: &ContractEvent) -> ReceiptLog {
    match event {
        ContractEvent::BucketTypeActivated { amount: a, duration } => to_log(
            contract,
            &abi::BucketTypeActivated {
                amount: amount(*a),
                duration: uint(*duration),
            },
        ),
        ContractEvent::BucketTypeDeactivated { amount: a, duration } => to_log(
            contract,
            &abi::BucketTypeDeactivated {
                amount: amount(*a),
                duration: uint(*duration),
            },
        ),
        ContractEvent::Staked {
            token_id,
            delegate,
            amount: a,
            duration,
        } => to_log(
            contract,
            &abi::Staked {
                tokenId: uint(*token_id),
                delegate: bytes12(delegate),
                amount: amount(*a),
                duration: uint(*duration),
            },
        ),
        ContractEvent::Locked { token_id, duration } => to_log(
            contract,
            &abi::Locked {
                tokenId: uint(*token_id),
                duration: uint(*duration),
            },
        ),
        ContractEvent::Unlocked { token_id } => to_log(
            contract,
            &abi::Unlocked {
                tokenId: uint(*token_id),
            },
        ),
        ContractEvent::Unstaked { token_id } => to_log(
            contract,
            &abi::Unstaked {
                tokenId: uint(*token_id),
            },
        ),
        ContractEvent::Merged {
            token_ids,
            amount: a,
            duration,
        } => to_log(
            contract,
            &abi::Merged {
                tokenIds: token_ids.iter().map(|id| uint(*id)).collect(),
                amount: amount(*a),
                duration: uint(*duration),
            },
        ),
        ContractEvent::DurationExtended { token_id, duration } => to_log(
            contract,
            &abi::DurationExtended {
                tokenId: uint(*token_id),
                duration: uint(*duration),
            },
        ),
        ContractEvent::AmountIncreased { token_id, amount: a } => to_log(
            contract,
            &abi::AmountIncreased {
                tokenId: uint(*token_id),
                amount: amount(*a),
            },
        ),
        ContractEvent::DelegateChanged {
            token_id,
            new_delegate,
        } => to_log(
            contract,
            &abi::DelegateChanged {
                tokenId: uint(*token_id),
                newDelegate: bytes12(new_delegate),
            },
        ),
        ContractEvent::Withdrawal {
            token_id,
            recipient,
        } => to_log(
            contract,
            &abi::Withdrawal {
                tokenId: uint(*token_id),
                recipient: address(recipient),
            },
        ),
        ContractEvent::Transfer { from, to, token_id } => to_log(
            contract,
            &abi::Transfer {
                from: address(from),
                to: address(to),
                tokenId: uint(*token_id),
            },
        ),
        ContractEvent::Unrecognized { .. } => panic!("unrecognized events cannot be encoded"),
    }
}

/// A log with a signature the staking contract does not declare.
pub fn foreign_log(contract: Address) -> ReceiptLog {
    let topic: Hash = [0xEE; 32];
    ReceiptLog::new(contract, vec![topic], vec![0u8; 32])
}

// =============================================================================
// BLOCKS
// =============================================================================

/// Builds an [`IndexedBlock`] receipt by receipt.
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    height: u64,
    timestamp: Timestamp,
    receipts: Vec<Receipt>,
}

impl BlockBuilder {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            timestamp: block_timestamp(height),
            receipts: Vec::new(),
        }
    }

    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Add a successful receipt.
    pub fn tx(mut self, logs: Vec<ReceiptLog>) -> Self {
        self.receipts.push(Receipt::success(logs));
        self
    }

    /// Add a failed receipt.
    pub fn failed_tx(mut self, logs: Vec<ReceiptLog>) -> Self {
        self.receipts.push(Receipt::failure(logs));
        self
    }

    /// Add one successful receipt per event, emitted by `contract`.
    pub fn events(mut self, contract: Address, events: &[ContractEvent]) -> Self {
        for event in events {
            self.receipts
                .push(Receipt::success(vec![staking_log(contract, event)]));
        }
        self
    }

    pub fn build(self) -> IndexedBlock {
        IndexedBlock::new(self.height, self.timestamp, self.receipts)
    }
}

/// A block at `height` whose receipts carry no staking logs.
pub fn empty_block(height: u64) -> IndexedBlock {
    BlockBuilder::new(height).build()
}

// =============================================================================
// FAULT INJECTION
// =============================================================================

/// In-memory store whose writes can be made to fail.
///
/// Clones share the switch, so a test keeps one to flip while the indexer
/// owns another.
#[derive(Debug, Default, Clone)]
pub struct FailingKVStore {
    inner: InMemoryKVStore,
    fail_writes: Arc<AtomicBool>,
}

impl FailingKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing store.
    pub fn wrap(inner: InMemoryKVStore) -> Self {
        Self {
            inner,
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Switch shared by every clone of this store.
    pub fn switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_writes)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The wrapped store.
    pub fn inner(&self) -> &InMemoryKVStore {
        &self.inner
    }

    fn check(&self) -> Result<(), KVStoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KVStoreError::IOError {
                message: "injected write failure".to_string(),
            });
        }
        Ok(())
    }
}

impl KeyValueStore for FailingKVStore {
    fn get(&self, namespace: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.inner.get(namespace, key)
    }

    fn put(&mut self, namespace: Namespace, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.check()?;
        self.inner.put(namespace, key, value)
    }

    fn delete(&mut self, namespace: Namespace, key: &[u8]) -> Result<(), KVStoreError> {
        self.check()?;
        self.inner.delete(namespace, key)
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        self.check()?;
        self.inner.atomic_batch_write(operations)
    }

    fn scan(&self, namespace: Namespace) -> ScanResult {
        self.inner.scan(namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::abi::StakingAbiDecoder;
    use crate::ports::outbound::EventDecoder;

    #[test]
    fn test_encoded_logs_decode_back() {
        let contract = Address::new([0x11; 20]);
        let decoder = StakingAbiDecoder::new();
        let events = [
            ContractEvent::Staked {
                token_id: 3,
                delegate: Candidate::from_name("cand-A").unwrap(),
                amount: U256::from(1000u64),
                duration: 100,
            },
            ContractEvent::Merged {
                token_ids: vec![1, 2],
                amount: U256::from(2000u64),
                duration: 100,
            },
            ContractEvent::Transfer {
                from: Address::ZERO,
                to: Address::new([7; 20]),
                token_id: 3,
            },
        ];
        for event in events {
            let log = staking_log(contract, &event);
            assert_eq!(decoder.decode(&log).unwrap(), event);
        }
    }

    #[test]
    fn test_failing_store_switch_is_shared() {
        let mut store = FailingKVStore::new();
        let handle = store.clone();
        handle.set_fail_writes(true);
        assert!(store.put(Namespace::Bucket, b"k", b"v").is_err());
        handle.set_fail_writes(false);
        assert!(store.put(Namespace::Bucket, b"k", b"v").is_ok());
    }
}
