//! # Staking Cache
//!
//! Point-in-time snapshot of every bucket type and live bucket, with the
//! secondary indexes kept in step on each mutation:
//!
//! - candidate -> bucket ids ([`CandidateIndex`])
//! - (amount, duration) -> bucket type id
//!
//! The indexer shares one cache behind an `Arc` and never mutates it; each
//! block is applied to a [`StakingCache::copy`] that replaces the shared one
//! on commit.

use super::candidate_index::CandidateIndex;
use super::checkpoint;
use super::codec;
use super::entities::{Bucket, BucketType, BucketTypeKey, Candidate};
use super::errors::{IndexInconsistency, KVStoreError, StakingIndexError};
use super::value_objects::{checkpoint_keys, Namespace};
use crate::ports::outbound::{KeyValueStore, ScanResult};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StakingCache {
    bucket_types: BTreeMap<u64, BucketType>,
    bucket_type_ids: HashMap<BucketTypeKey, u64>,
    buckets: BTreeMap<u64, Bucket>,
    by_candidate: CandidateIndex,
    total_bucket_count: u64,
    /// Highest token id ever staked; ids at or below it are spent.
    highest_bucket_id: Option<u64>,
}

impl StakingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Structurally independent clone.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    // -------------------------------------------------------------------------
    // Buckets
    // -------------------------------------------------------------------------

    /// Upsert a bucket and repair the candidate index.
    pub fn put_bucket(&mut self, id: u64, bucket: Bucket) {
        let candidate = bucket.candidate;
        match self.buckets.insert(id, bucket) {
            Some(old) => self.by_candidate.reassign(&old.candidate, candidate, id),
            None => self.by_candidate.insert(candidate, id),
        }
    }

    /// Remove a bucket from the live map and the candidate index.
    pub fn delete_bucket(&mut self, id: u64) -> Option<Bucket> {
        let removed = self.buckets.remove(&id)?;
        self.by_candidate.remove(&removed.candidate, id);
        Some(removed)
    }

    pub fn bucket(&self, id: u64) -> Option<&Bucket> {
        self.buckets.get(&id)
    }

    /// Live buckets, ascending by id.
    pub fn buckets(&self) -> impl Iterator<Item = (u64, &Bucket)> {
        self.buckets.iter().map(|(id, b)| (*id, b))
    }

    /// Live buckets delegated to `candidate`, ascending by id.
    pub fn buckets_by_candidate<'a>(
        &'a self,
        candidate: &Candidate,
    ) -> impl Iterator<Item = (u64, &'a Bucket)> + 'a {
        let ids: Vec<u64> = self.by_candidate.ids(candidate).collect();
        ids.into_iter()
            .filter_map(move |id| self.buckets.get(&id).map(|b| (id, b)))
    }

    pub fn live_bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn candidate_count(&self) -> usize {
        self.by_candidate.len()
    }

    /// Buckets ever staked, burned ones included.
    pub fn total_bucket_count(&self) -> u64 {
        self.total_bucket_count
    }

    /// Highest token id ever staked, burned ones included.
    pub fn highest_bucket_id(&self) -> Option<u64> {
        self.highest_bucket_id
    }

    /// Whether `id` was already handed out to a bucket.
    pub fn is_spent_bucket_id(&self, id: u64) -> bool {
        self.highest_bucket_id.is_some_and(|highest| id <= highest)
    }

    /// Account for a newly staked bucket `id`.
    pub fn record_staked(&mut self, id: u64) {
        self.total_bucket_count = self.total_bucket_count.saturating_add(1);
        self.highest_bucket_id = self.highest_bucket_id.max(Some(id));
    }

    // -------------------------------------------------------------------------
    // Bucket types
    // -------------------------------------------------------------------------

    /// Upsert a bucket type and its key mapping.
    pub fn put_bucket_type(&mut self, id: u64, bucket_type: BucketType) {
        let key = bucket_type.key();
        if let Some(old) = self.bucket_types.insert(id, bucket_type) {
            if old.key() != key {
                self.bucket_type_ids.remove(&old.key());
            }
        }
        self.bucket_type_ids.insert(key, id);
    }

    pub fn bucket_type(&self, id: u64) -> Option<&BucketType> {
        self.bucket_types.get(&id)
    }

    /// Reverse lookup of a bucket type id by (amount, duration).
    pub fn bucket_type_index(&self, key: &BucketTypeKey) -> Option<u64> {
        self.bucket_type_ids.get(key).copied()
    }

    /// Number of bucket type ids allocated; also the next id to allocate.
    pub fn bucket_type_count(&self) -> u64 {
        self.bucket_types
            .keys()
            .next_back()
            .map_or(0, |id| id.saturating_add(1))
    }

    /// All bucket types, ascending by id.
    pub fn bucket_types(&self) -> impl Iterator<Item = (u64, &BucketType)> {
        self.bucket_types.iter().map(|(id, t)| (*id, t))
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Rebuild the cache from the store.
    ///
    /// Every row must decode. A namespace that was never written loads as
    /// empty.
    pub fn load<KV: KeyValueStore + ?Sized>(store: &KV) -> Result<Self, StakingIndexError> {
        let mut cache = Self::new();

        for (key, value) in scan_or_empty(store.scan(Namespace::BucketType))? {
            let id = codec::decode_u64(&key)?;
            cache.put_bucket_type(id, codec::decode_bucket_type(&value)?);
        }

        for (key, value) in scan_or_empty(store.scan(Namespace::Bucket))? {
            let id = codec::decode_u64(&key)?;
            let bucket = codec::decode_bucket(&value)?;
            if cache.bucket_type(bucket.type_index).is_none() {
                return Err(StakingIndexError::BucketTypeNotFound {
                    type_id: bucket.type_index,
                });
            }
            cache.put_bucket(id, bucket);
        }

        if let Some(raw) = checkpoint::read(store, checkpoint_keys::TOTAL_BUCKET_COUNT)? {
            cache.total_bucket_count = codec::decode_u64(&raw)?;
        }
        if let Some(raw) = checkpoint::read(store, checkpoint_keys::HIGHEST_BUCKET_ID)? {
            cache.highest_bucket_id = Some(codec::decode_u64(&raw)?);
        }
        let highest_live = cache.buckets.keys().next_back().copied();
        cache.highest_bucket_id = cache.highest_bucket_id.max(highest_live);

        info!(
            "[qc-18] Loaded staking cache: {} bucket types, {} buckets, {} candidates",
            cache.bucket_types.len(),
            cache.buckets.len(),
            cache.by_candidate.len()
        );
        Ok(cache)
    }

    /// Verify the secondary indexes against the primary maps.
    pub fn check_consistency(&self) -> Result<(), IndexInconsistency> {
        self.by_candidate.check_against(&self.buckets)?;
        if self.bucket_type_ids.len() != self.bucket_types.len() {
            let orphan = self
                .bucket_types
                .iter()
                .find(|(id, t)| self.bucket_type_ids.get(&t.key()) != Some(id))
                .map_or(0, |(id, _)| *id);
            return Err(IndexInconsistency::BucketTypeKeyMismatch { type_id: orphan });
        }
        for (key, id) in &self.bucket_type_ids {
            if self.bucket_types.get(id).map(BucketType::key) != Some(*key) {
                return Err(IndexInconsistency::BucketTypeKeyMismatch { type_id: *id });
            }
        }
        Ok(())
    }
}

fn scan_or_empty(result: ScanResult) -> ScanResult {
    match result {
        Err(KVStoreError::NamespaceNotFound { .. }) => Ok(Vec::new()),
        other => other,
    }
}
