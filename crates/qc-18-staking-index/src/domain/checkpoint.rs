//! # Checkpoint
//!
//! Last committed height and the contract the store was built for, plus the
//! block continuity rule.

use super::codec;
use super::entities::Address;
use super::errors::{KVStoreError, StakingIndexError};
use super::value_objects::{checkpoint_keys, Namespace};
use crate::ports::outbound::{BatchOperation, KeyValueStore};

/// Outcome of checking an incoming block height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    /// The height was already committed; applying it again is a no-op.
    AlreadyIndexed,
    /// The height is the next one to apply.
    Next,
}

/// Persisted progress of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Checkpoint {
    /// Last committed height; `None` before the first commit.
    pub height: Option<u64>,
    /// Contract the store was built for; `None` before the first commit.
    pub contract: Option<Address>,
}

impl Checkpoint {
    /// Read the checkpoint from the store.
    pub fn load<KV: KeyValueStore + ?Sized>(store: &KV) -> Result<Self, StakingIndexError> {
        let height = read(store, checkpoint_keys::HEIGHT)?
            .map(|raw| codec::decode_u64(&raw))
            .transpose()?;
        let contract = read(store, checkpoint_keys::CONTRACT_ADDRESS)?
            .map(|raw| codec::decode_address(&raw))
            .transpose()?;
        Ok(Self { height, contract })
    }

    /// The next height the feed must deliver.
    pub fn expected_height(&self, start_height: u64) -> u64 {
        match self.height {
            None => start_height,
            Some(h) => h.saturating_add(1).max(start_height),
        }
    }

    /// Classify `height` against the checkpoint.
    pub fn continuity(&self, height: u64, start_height: u64) -> Result<Continuity, StakingIndexError> {
        let expected = self.expected_height(start_height);
        if height < expected {
            Ok(Continuity::AlreadyIndexed)
        } else if height == expected {
            Ok(Continuity::Next)
        } else {
            Err(StakingIndexError::Continuity {
                expected,
                actual: height,
            })
        }
    }

    /// Batch operations advancing the checkpoint to `height`.
    pub fn advance_ops(height: u64, contract: Address) -> [BatchOperation; 2] {
        [
            BatchOperation::put(
                Namespace::Checkpoint,
                checkpoint_keys::HEIGHT,
                codec::encode_u64(height),
            ),
            BatchOperation::put(
                Namespace::Checkpoint,
                checkpoint_keys::CONTRACT_ADDRESS,
                contract.as_bytes().to_vec(),
            ),
        ]
    }
}

/// Point read in the checkpoint namespace; a namespace that was never written
/// reads as absent.
pub(crate) fn read<KV: KeyValueStore + ?Sized>(
    store: &KV,
    key: &[u8],
) -> Result<Option<Vec<u8>>, StakingIndexError> {
    match store.get(Namespace::Checkpoint, key) {
        Ok(value) => Ok(value),
        Err(KVStoreError::NotFound) | Err(KVStoreError::NamespaceNotFound { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryKVStore;

    #[test]
    fn test_continuity_from_empty_store() {
        let cp = Checkpoint::default();
        assert_eq!(cp.continuity(10, 10), Ok(Continuity::Next));
        assert_eq!(cp.continuity(9, 10), Ok(Continuity::AlreadyIndexed));
        assert_eq!(
            cp.continuity(11, 10),
            Err(StakingIndexError::Continuity {
                expected: 10,
                actual: 11
            })
        );
    }

    #[test]
    fn test_continuity_after_commit() {
        let cp = Checkpoint {
            height: Some(20),
            contract: None,
        };
        assert_eq!(cp.continuity(20, 10), Ok(Continuity::AlreadyIndexed));
        assert_eq!(cp.continuity(21, 10), Ok(Continuity::Next));
        assert!(cp.continuity(23, 10).is_err());
    }

    #[test]
    fn test_load_roundtrip() {
        let mut store = InMemoryKVStore::new();
        assert_eq!(Checkpoint::load(&store).unwrap(), Checkpoint::default());

        let contract = Address::new([3; 20]);
        store
            .atomic_batch_write(Checkpoint::advance_ops(42, contract).to_vec())
            .unwrap();
        assert_eq!(
            Checkpoint::load(&store).unwrap(),
            Checkpoint {
                height: Some(42),
                contract: Some(contract),
            }
        );
    }
}
