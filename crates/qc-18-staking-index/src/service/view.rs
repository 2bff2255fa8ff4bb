//! # Staking View
//!
//! Read handle pinned to one committed snapshot. Later commits replace the
//! indexer's snapshot but never the one a view holds, so a view answers
//! every query from the same block.

use crate::domain::cache::StakingCache;
use crate::domain::entities::{Address, Bucket, BucketType, Candidate, VoteBucket};
use crate::domain::errors::IndexInconsistency;
use std::sync::Arc;
use std::time::Duration;

/// Point-in-time snapshot statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexStats {
    /// Height the snapshot reflects; `None` before the first commit.
    pub height: Option<u64>,
    pub live_buckets: usize,
    pub candidates: usize,
    pub bucket_types: u64,
    pub total_bucket_count: u64,
}

#[derive(Debug, Clone)]
pub struct StakingView {
    cache: Arc<StakingCache>,
    height: Option<u64>,
    contract_address: Address,
    block_interval: Duration,
}

impl StakingView {
    pub(crate) fn new(
        cache: Arc<StakingCache>,
        height: Option<u64>,
        contract_address: Address,
        block_interval: Duration,
    ) -> Self {
        Self {
            cache,
            height,
            contract_address,
            block_interval,
        }
    }

    /// Height this view reflects.
    pub fn height(&self) -> Option<u64> {
        self.height
    }

    pub fn bucket(&self, id: u64) -> Option<Bucket> {
        self.cache.bucket(id).cloned()
    }

    /// All live buckets, ascending by id.
    pub fn buckets(&self) -> Vec<(u64, Bucket)> {
        self.cache
            .buckets()
            .map(|(id, b)| (id, b.clone()))
            .collect()
    }

    pub fn buckets_by_candidate(&self, candidate: &Candidate) -> Vec<(u64, Bucket)> {
        self.cache
            .buckets_by_candidate(candidate)
            .map(|(id, b)| (id, b.clone()))
            .collect()
    }

    /// One entry per requested id, `None` where no live bucket exists.
    pub fn buckets_by_indices(&self, ids: &[u64]) -> Vec<Option<Bucket>> {
        ids.iter().map(|id| self.bucket(*id)).collect()
    }

    pub fn total_bucket_count(&self) -> u64 {
        self.cache.total_bucket_count()
    }

    pub fn bucket_type(&self, id: u64) -> Option<BucketType> {
        self.cache.bucket_type(id).cloned()
    }

    /// Bucket types ascending by id, optionally only the active ones.
    pub fn bucket_types(&self, active_only: bool) -> Vec<(u64, BucketType)> {
        self.cache
            .bucket_types()
            .filter(|(_, t)| !active_only || t.is_active())
            .map(|(id, t)| (id, t.clone()))
            .collect()
    }

    pub fn bucket_type_count(&self) -> u64 {
        self.cache.bucket_type_count()
    }

    /// Bucket joined with its type. `None` if the bucket is not live.
    pub fn vote_bucket(&self, id: u64) -> Option<VoteBucket> {
        let bucket = self.cache.bucket(id)?;
        // Types are never removed, so a live bucket always resolves.
        let bucket_type = self.cache.bucket_type(bucket.type_index)?;
        Some(VoteBucket::assemble(
            id,
            bucket,
            bucket_type,
            self.contract_address,
            self.block_interval,
        ))
    }

    pub fn vote_buckets_by_indices(&self, ids: &[u64]) -> Vec<Option<VoteBucket>> {
        ids.iter().map(|id| self.vote_bucket(*id)).collect()
    }

    pub fn vote_buckets_by_candidate(&self, candidate: &Candidate) -> Vec<VoteBucket> {
        self.cache
            .buckets_by_candidate(candidate)
            .filter_map(|(id, _)| self.vote_bucket(id))
            .collect()
    }

    /// Verify the snapshot's secondary indexes.
    pub fn check_consistency(&self) -> Result<(), IndexInconsistency> {
        self.cache.check_consistency()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            height: self.height,
            live_buckets: self.cache.live_bucket_count(),
            candidates: self.cache.candidate_count(),
            bucket_types: self.cache.bucket_type_count(),
            total_bucket_count: self.cache.total_bucket_count(),
        }
    }
}
