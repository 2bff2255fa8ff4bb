//! # Event Handler
//!
//! Applies one block's events to a private copy of the cache and collects the
//! matching store writes. Nothing here touches the shared cache or the store;
//! [`EventHandler::finalize`] hands both results to the indexer's commit.

use crate::domain::cache::StakingCache;
use crate::domain::codec;
use crate::domain::entities::{Address, Bucket, BucketType, BucketTypeKey, Timestamp, U256};
use crate::domain::errors::{DecodeError, StakingIndexError};
use crate::domain::events::ContractEvent;
use crate::domain::value_objects::{checkpoint_keys, id_key, Namespace};
use crate::ports::outbound::BatchOperation;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Per-block state transition over a cache copy.
pub struct EventHandler {
    dirty: StakingCache,
    delta: Vec<BatchOperation>,
    height: u64,
    timestamp: Timestamp,
    /// Mint transfers seen before the bucket's `Staked`.
    pending_owners: HashMap<u64, Address>,
}

impl EventHandler {
    /// Start a block at `height` over a copy of `base`.
    pub fn new(base: &StakingCache, height: u64, timestamp: Timestamp) -> Self {
        Self {
            dirty: base.copy(),
            delta: Vec::new(),
            height,
            timestamp,
            pending_owners: HashMap::new(),
        }
    }

    /// Apply one event. An error leaves the handler unusable for the block.
    pub fn handle_event(&mut self, event: ContractEvent) -> Result<(), StakingIndexError> {
        debug!("[qc-18] Block {}: {:?}", self.height, event);
        match event {
            ContractEvent::BucketTypeActivated { amount, duration } => {
                let key = BucketTypeKey::new(amount, duration);
                let id = self
                    .dirty
                    .bucket_type_index(&key)
                    .unwrap_or_else(|| self.dirty.bucket_type_count());
                self.put_bucket_type(id, BucketType::new(amount, duration, Some(self.timestamp)))
            }
            ContractEvent::BucketTypeDeactivated { amount, duration } => {
                let (id, mut bucket_type) = self.bucket_type_by_key(amount, duration)?;
                bucket_type.activated_at = None;
                self.put_bucket_type(id, bucket_type)
            }
            ContractEvent::Staked {
                token_id,
                delegate,
                amount,
                duration,
            } => {
                if let Some(highest) = self.dirty.highest_bucket_id() {
                    if token_id <= highest {
                        return Err(StakingIndexError::BucketIdReused { token_id, highest });
                    }
                }
                let (type_index, _) = self.bucket_type_by_key(amount, duration)?;
                let mut bucket = Bucket::new(type_index, delegate, self.height);
                bucket.owner = self.pending_owners.remove(&token_id);
                self.dirty.record_staked(token_id);
                self.put_bucket(token_id, bucket)
            }
            ContractEvent::Locked { token_id, duration } => {
                let mut bucket = self.bucket(token_id)?;
                let current = self.bucket_type(bucket.type_index)?;
                bucket.type_index = self.bucket_type_by_key(current.amount, duration)?.0;
                bucket.unlocked_at = None;
                self.put_bucket(token_id, bucket)
            }
            ContractEvent::Unlocked { token_id } => {
                let mut bucket = self.bucket(token_id)?;
                bucket.unlocked_at = Some(self.timestamp);
                self.put_bucket(token_id, bucket)
            }
            ContractEvent::Unstaked { token_id } => {
                let mut bucket = self.bucket(token_id)?;
                bucket.unstaked_at = Some(self.timestamp);
                self.put_bucket(token_id, bucket)
            }
            ContractEvent::Merged {
                token_ids,
                amount,
                duration,
            } => {
                let Some((&first, rest)) = token_ids.split_first() else {
                    return Err(DecodeError::InvalidField {
                        field: "tokenIds",
                        reason: "empty merge list".to_string(),
                    }
                    .into());
                };
                let (type_index, _) = self.bucket_type_by_key(amount, duration)?;
                let mut bucket = self.bucket(first)?;
                bucket.type_index = type_index;
                bucket.unlocked_at = None;
                for &id in rest {
                    self.burn(id);
                }
                self.put_bucket(first, bucket)
            }
            ContractEvent::DurationExtended { token_id, duration } => {
                let mut bucket = self.bucket(token_id)?;
                let current = self.bucket_type(bucket.type_index)?;
                bucket.type_index = self.bucket_type_by_key(current.amount, duration)?.0;
                self.put_bucket(token_id, bucket)
            }
            ContractEvent::AmountIncreased { token_id, amount } => {
                let mut bucket = self.bucket(token_id)?;
                let current = self.bucket_type(bucket.type_index)?;
                bucket.type_index = self.bucket_type_by_key(amount, current.duration)?.0;
                self.put_bucket(token_id, bucket)
            }
            ContractEvent::DelegateChanged {
                token_id,
                new_delegate,
            } => {
                let mut bucket = self.bucket(token_id)?;
                bucket.candidate = new_delegate;
                self.put_bucket(token_id, bucket)
            }
            ContractEvent::Withdrawal { token_id, .. } => {
                self.burn(token_id);
                Ok(())
            }
            ContractEvent::Transfer { from, to, token_id } => self.transfer(from, to, token_id),
            ContractEvent::Unrecognized { topic } => {
                debug!(
                    "[qc-18] Block {}: ignoring unrecognized log {}",
                    self.height,
                    topic.map_or_else(|| "<anonymous>".to_string(), hex::encode)
                );
                Ok(())
            }
        }
    }

    /// Yield the write batch and the updated cache.
    ///
    /// The batch always carries the counters so a block's data and its
    /// checkpoint land together.
    pub fn finalize(mut self) -> (Vec<BatchOperation>, StakingCache) {
        if !self.pending_owners.is_empty() {
            warn!(
                "[qc-18] Block {}: {} mint transfer(s) without a matching Staked event",
                self.height,
                self.pending_owners.len()
            );
        }
        self.delta.push(BatchOperation::put(
            Namespace::Checkpoint,
            checkpoint_keys::TOTAL_BUCKET_COUNT,
            codec::encode_u64(self.dirty.total_bucket_count()),
        ));
        if let Some(highest) = self.dirty.highest_bucket_id() {
            self.delta.push(BatchOperation::put(
                Namespace::Checkpoint,
                checkpoint_keys::HIGHEST_BUCKET_ID,
                codec::encode_u64(highest),
            ));
        }
        (self.delta, self.dirty)
    }

    fn transfer(&mut self, from: Address, to: Address, token_id: u64) -> Result<(), StakingIndexError> {
        // Burns are applied by `Withdrawal`.
        if to.is_zero() {
            return Ok(());
        }
        if let Some(bucket) = self.dirty.bucket(token_id) {
            let mut bucket = bucket.clone();
            bucket.owner = Some(to);
            return self.put_bucket(token_id, bucket);
        }
        if from.is_zero() {
            self.pending_owners.insert(token_id, to);
            return Ok(());
        }
        Err(StakingIndexError::BucketNotFound { token_id })
    }

    fn bucket(&self, token_id: u64) -> Result<Bucket, StakingIndexError> {
        self.dirty
            .bucket(token_id)
            .cloned()
            .ok_or(StakingIndexError::BucketNotFound { token_id })
    }

    fn bucket_type(&self, type_id: u64) -> Result<BucketType, StakingIndexError> {
        self.dirty
            .bucket_type(type_id)
            .cloned()
            .ok_or(StakingIndexError::BucketTypeNotFound { type_id })
    }

    fn bucket_type_by_key(
        &self,
        amount: U256,
        duration: u64,
    ) -> Result<(u64, BucketType), StakingIndexError> {
        let key = BucketTypeKey::new(amount, duration);
        let id = self
            .dirty
            .bucket_type_index(&key)
            .ok_or(StakingIndexError::BucketTypeKeyNotFound { key })?;
        Ok((id, self.bucket_type(id)?))
    }

    fn put_bucket(&mut self, token_id: u64, bucket: Bucket) -> Result<(), StakingIndexError> {
        let value = codec::encode_bucket(&bucket)?;
        self.delta
            .push(BatchOperation::put(Namespace::Bucket, id_key(token_id), value));
        self.dirty.put_bucket(token_id, bucket);
        Ok(())
    }

    fn put_bucket_type(&mut self, id: u64, bucket_type: BucketType) -> Result<(), StakingIndexError> {
        let value = codec::encode_bucket_type(&bucket_type)?;
        self.delta
            .push(BatchOperation::put(Namespace::BucketType, id_key(id), value));
        self.dirty.put_bucket_type(id, bucket_type);
        Ok(())
    }

    fn burn(&mut self, token_id: u64) {
        self.pending_owners.remove(&token_id);
        self.dirty.delete_bucket(token_id);
        self.delta
            .push(BatchOperation::delete(Namespace::Bucket, id_key(token_id)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Candidate;

    const TS: Timestamp = 1_700_000_000;

    fn amount(v: u64) -> U256 {
        U256::from(v)
    }

    fn cand(name: &str) -> Candidate {
        Candidate::from_name(name).unwrap()
    }

    fn apply(base: &StakingCache, events: Vec<ContractEvent>) -> Result<StakingCache, StakingIndexError> {
        let mut handler = EventHandler::new(base, 10, TS);
        for event in events {
            handler.handle_event(event)?;
        }
        Ok(handler.finalize().1)
    }

    fn activated(a: u64, d: u64) -> ContractEvent {
        ContractEvent::BucketTypeActivated {
            amount: amount(a),
            duration: d,
        }
    }

    fn staked(id: u64, c: &str, a: u64, d: u64) -> ContractEvent {
        ContractEvent::Staked {
            token_id: id,
            delegate: cand(c),
            amount: amount(a),
            duration: d,
        }
    }

    #[test]
    fn test_activate_and_stake() {
        let cache = apply(
            &StakingCache::new(),
            vec![activated(1000, 100), staked(7, "cand-A", 1000, 100)],
        )
        .unwrap();

        let bucket = cache.bucket(7).unwrap();
        assert_eq!(bucket.type_index, 0);
        assert_eq!(bucket.created_at, 10);
        assert!(bucket.is_locked());
        assert_eq!(cache.total_bucket_count(), 1);
        assert_eq!(cache.bucket_type(0).unwrap().activated_at, Some(TS));
    }

    #[test]
    fn test_stake_without_type_fails() {
        let err = apply(&StakingCache::new(), vec![staked(1, "a", 5, 5)]).unwrap_err();
        assert!(matches!(err, StakingIndexError::BucketTypeKeyNotFound { .. }));
    }

    #[test]
    fn test_reactivation_reuses_id() {
        let cache = apply(
            &StakingCache::new(),
            vec![
                activated(1000, 100),
                activated(2000, 100),
                ContractEvent::BucketTypeDeactivated {
                    amount: amount(1000),
                    duration: 100,
                },
                activated(1000, 100),
            ],
        )
        .unwrap();
        assert_eq!(cache.bucket_type_count(), 2);
        assert!(cache.bucket_type(0).unwrap().is_active());
    }

    #[test]
    fn test_lock_unlock_unstake_cycle() {
        let base = apply(
            &StakingCache::new(),
            vec![activated(1000, 100), activated(1000, 200), staked(1, "a", 1000, 100)],
        )
        .unwrap();

        let cache = apply(
            &base,
            vec![
                ContractEvent::Unlocked { token_id: 1 },
                ContractEvent::Locked {
                    token_id: 1,
                    duration: 200,
                },
            ],
        )
        .unwrap();
        let bucket = cache.bucket(1).unwrap();
        assert_eq!(bucket.type_index, 1);
        assert!(bucket.is_locked());

        let cache = apply(
            &base,
            vec![
                ContractEvent::Unlocked { token_id: 1 },
                ContractEvent::Unstaked { token_id: 1 },
            ],
        )
        .unwrap();
        let bucket = cache.bucket(1).unwrap();
        assert_eq!(bucket.unlocked_at, Some(TS));
        assert_eq!(bucket.unstaked_at, Some(TS));
    }

    #[test]
    fn test_merge_burns_all_but_first() {
        let base = apply(
            &StakingCache::new(),
            vec![
                activated(10, 5),
                activated(30, 5),
                staked(1, "a", 10, 5),
                staked(2, "b", 10, 5),
                staked(3, "a", 10, 5),
            ],
        )
        .unwrap();

        let cache = apply(
            &base,
            vec![ContractEvent::Merged {
                token_ids: vec![1, 2, 3],
                amount: amount(30),
                duration: 5,
            }],
        )
        .unwrap();

        assert_eq!(cache.bucket(1).unwrap().type_index, 1);
        assert!(cache.bucket(2).is_none());
        assert!(cache.bucket(3).is_none());
        assert_eq!(cache.total_bucket_count(), 3);
        assert_eq!(cache.buckets_by_candidate(&cand("b")).count(), 0);
        cache.check_consistency().unwrap();
    }

    #[test]
    fn test_retargets_require_existing_type() {
        let base = apply(
            &StakingCache::new(),
            vec![activated(10, 5), staked(1, "a", 10, 5)],
        )
        .unwrap();

        let err = apply(
            &base,
            vec![ContractEvent::DurationExtended {
                token_id: 1,
                duration: 6,
            }],
        )
        .unwrap_err();
        assert!(matches!(err, StakingIndexError::BucketTypeKeyNotFound { .. }));

        let err = apply(
            &base,
            vec![ContractEvent::AmountIncreased {
                token_id: 9,
                amount: amount(20),
            }],
        )
        .unwrap_err();
        assert_eq!(err, StakingIndexError::BucketNotFound { token_id: 9 });
    }

    #[test]
    fn test_withdrawn_id_cannot_be_restaked() {
        let base = apply(
            &StakingCache::new(),
            vec![
                activated(10, 5),
                staked(4, "a", 10, 5),
                ContractEvent::Withdrawal {
                    token_id: 4,
                    recipient: Address::new([1; 20]),
                },
            ],
        )
        .unwrap();
        assert!(base.bucket(4).is_none());
        assert_eq!(base.total_bucket_count(), 1);

        let err = apply(&base, vec![staked(4, "a", 10, 5)]).unwrap_err();
        assert_eq!(
            err,
            StakingIndexError::BucketIdReused {
                token_id: 4,
                highest: 4
            }
        );
    }

    #[test]
    fn test_max_token_id_is_spent_after_withdrawal() {
        let base = apply(
            &StakingCache::new(),
            vec![
                activated(10, 5),
                staked(u64::MAX, "a", 10, 5),
                ContractEvent::Withdrawal {
                    token_id: u64::MAX,
                    recipient: Address::new([1; 20]),
                },
            ],
        )
        .unwrap();
        assert!(base.bucket(u64::MAX).is_none());

        let err = apply(&base, vec![staked(u64::MAX, "a", 10, 5)]).unwrap_err();
        assert_eq!(
            err,
            StakingIndexError::BucketIdReused {
                token_id: u64::MAX,
                highest: u64::MAX
            }
        );
        assert!(apply(&base, vec![staked(1, "a", 10, 5)]).is_err());
    }

    #[test]
    fn test_mint_transfer_before_stake_sets_owner() {
        let owner = Address::new([0xAA; 20]);
        let buyer = Address::new([0xBB; 20]);
        let cache = apply(
            &StakingCache::new(),
            vec![
                activated(10, 5),
                ContractEvent::Transfer {
                    from: Address::ZERO,
                    to: owner,
                    token_id: 1,
                },
                staked(1, "a", 10, 5),
            ],
        )
        .unwrap();
        assert_eq!(cache.bucket(1).unwrap().owner, Some(owner));

        let cache = apply(
            &cache,
            vec![ContractEvent::Transfer {
                from: owner,
                to: buyer,
                token_id: 1,
            }],
        )
        .unwrap();
        assert_eq!(cache.bucket(1).unwrap().owner, Some(buyer));

        let err = apply(
            &cache,
            vec![ContractEvent::Transfer {
                from: owner,
                to: buyer,
                token_id: 2,
            }],
        )
        .unwrap_err();
        assert!(err.is_integrity_violation());
    }

    #[test]
    fn test_unrecognized_is_ignored_and_base_untouched() {
        let base = StakingCache::new();
        let mut handler = EventHandler::new(&base, 3, TS);
        handler
            .handle_event(ContractEvent::Unrecognized { topic: None })
            .unwrap();
        handler.handle_event(activated(1, 1)).unwrap();

        let (delta, dirty) = handler.finalize();
        assert_eq!(dirty.bucket_type_count(), 1);
        assert_eq!(base.bucket_type_count(), 0);
        let namespaces: Vec<Namespace> = delta.iter().map(BatchOperation::namespace).collect();
        assert_eq!(namespaces, vec![Namespace::BucketType, Namespace::Checkpoint]);
    }
}
