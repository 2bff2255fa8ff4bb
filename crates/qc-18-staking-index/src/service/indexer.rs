use super::handler::EventHandler;
use super::view::{IndexStats, StakingView};
use crate::adapters::abi::StakingAbiDecoder;
use crate::domain::block::IndexedBlock;
use crate::domain::cache::StakingCache;
use crate::domain::checkpoint::{Checkpoint, Continuity};
use crate::domain::entities::{Address, Bucket, BucketType, Candidate, VoteBucket};
use crate::domain::errors::StakingIndexError;
use crate::domain::value_objects::StakingIndexConfig;
use crate::ports::inbound::BlockIndexer;
use crate::ports::outbound::{EventDecoder, KeyValueStore};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Snapshot readers see. Replaced wholesale on commit.
#[derive(Debug, Default)]
struct IndexState {
    cache: Arc<StakingCache>,
    checkpoint: Checkpoint,
    started: bool,
}

/// The staking indexer.
///
/// One writer at a time (`ingest`), any number of readers. A block is applied
/// to a copy of the current snapshot; the copy becomes the snapshot only after
/// its batch is durably written.
pub struct StakingIndexer<KV, D = StakingAbiDecoder>
where
    KV: KeyValueStore,
    D: EventDecoder,
{
    config: StakingIndexConfig,
    store: Mutex<KV>,
    decoder: D,
    state: RwLock<IndexState>,
    ingest: Mutex<()>,
}

impl<KV: KeyValueStore> StakingIndexer<KV> {
    /// Create an indexer with the built-in ABI decoder.
    pub fn new(config: StakingIndexConfig, store: KV) -> Result<Self, StakingIndexError> {
        Self::with_decoder(config, store, StakingAbiDecoder::new())
    }
}

impl<KV, D> StakingIndexer<KV, D>
where
    KV: KeyValueStore,
    D: EventDecoder,
{
    /// Create an indexer with a custom log decoder.
    pub fn with_decoder(
        config: StakingIndexConfig,
        store: KV,
        decoder: D,
    ) -> Result<Self, StakingIndexError> {
        config.validate()?;
        Ok(Self {
            config,
            store: Mutex::new(store),
            decoder,
            state: RwLock::new(IndexState::default()),
            ingest: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &StakingIndexConfig {
        &self.config
    }

    pub fn contract_address(&self) -> Address {
        self.config.contract_address
    }

    /// Consume the indexer and hand back its store.
    pub fn into_store(self) -> KV {
        self.store.into_inner()
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Load the checkpoint and cache from the store.
    pub fn start(&self) -> Result<(), StakingIndexError> {
        let _ingest = self.ingest.lock();
        if self.state.read().started {
            return Ok(());
        }

        let (checkpoint, cache) = {
            let store = self.store.lock();
            let checkpoint = Checkpoint::load(&*store)?;
            if let Some(stored) = checkpoint.contract {
                if stored != self.config.contract_address {
                    return Err(StakingIndexError::ContractMismatch {
                        stored,
                        configured: self.config.contract_address,
                    });
                }
            }
            (checkpoint, StakingCache::load(&*store)?)
        };

        info!(
            "[qc-18] Staking indexer started for {} at height {:?} (start height {})",
            self.config.contract_address, checkpoint.height, self.config.start_height
        );
        *self.state.write() = IndexState {
            cache: Arc::new(cache),
            checkpoint,
            started: true,
        };
        Ok(())
    }

    /// Stop serving. `start` reloads from the store.
    pub fn stop(&self) -> Result<(), StakingIndexError> {
        let _ingest = self.ingest.lock();
        let mut state = self.state.write();
        if state.started {
            info!("[qc-18] Staking indexer stopped at height {:?}", state.checkpoint.height);
        }
        *state = IndexState::default();
        Ok(())
    }

    // =========================================================================
    // INGEST
    // =========================================================================

    /// Apply a block's staking events.
    pub fn put_block(&self, block: &IndexedBlock) -> Result<(), StakingIndexError> {
        let _ingest = self.ingest.lock();
        let (base, checkpoint) = {
            let state = self.state.read();
            if !state.started {
                return Err(StakingIndexError::NotStarted);
            }
            (Arc::clone(&state.cache), state.checkpoint)
        };

        if checkpoint.continuity(block.height, self.config.start_height)?
            == Continuity::AlreadyIndexed
        {
            debug!("[qc-18] Block {} already indexed, skipping", block.height);
            return Ok(());
        }

        let handler = self.apply(&base, block).map_err(|e| {
            warn!("[qc-18] Rejected block {}: {}", block.height, e);
            e
        })?;
        self.commit(handler, block.height)
    }

    fn apply(&self, base: &StakingCache, block: &IndexedBlock) -> Result<EventHandler, StakingIndexError> {
        let mut handler = EventHandler::new(base, block.height, block.timestamp);
        for log in block.contract_logs(&self.config.contract_address) {
            let event = self.decoder.decode(log)?;
            handler.handle_event(event)?;
        }
        Ok(handler)
    }

    /// Persist the handler's batch with the checkpoint, then publish its cache.
    fn commit(&self, handler: EventHandler, height: u64) -> Result<(), StakingIndexError> {
        let (mut batch, dirty) = handler.finalize();
        batch.extend(Checkpoint::advance_ops(height, self.config.contract_address));
        let ops = batch.len();

        self.store.lock().atomic_batch_write(batch).map_err(|e| {
            warn!("[qc-18] Failed to commit block {}: {}", height, e);
            e
        })?;

        let mut state = self.state.write();
        state.cache = Arc::new(dirty);
        state.checkpoint = Checkpoint {
            height: Some(height),
            contract: Some(self.config.contract_address),
        };
        info!("[qc-18] Committed block {} ({} writes)", height, ops);
        Ok(())
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Last committed height, or `start_height - 1` before the first commit.
    pub fn height(&self) -> Result<u64, StakingIndexError> {
        let state = self.state.read();
        if !state.started {
            return Err(StakingIndexError::NotStarted);
        }
        Ok(state
            .checkpoint
            .height
            .unwrap_or_else(|| self.config.start_height.saturating_sub(1)))
    }

    pub fn start_height(&self) -> u64 {
        self.config.start_height
    }

    /// Snapshot for `height`.
    ///
    /// `0` and the committed tip resolve to the tip snapshot; heights before
    /// `start_height` resolve to an empty snapshot. Only the tip is retained,
    /// so anything else is [`StakingIndexError::HeightNotIndexed`].
    pub fn view(&self, height: u64) -> Result<StakingView, StakingIndexError> {
        let state = self.state.read();
        if !state.started {
            return Err(StakingIndexError::NotStarted);
        }
        let tip = state.checkpoint.height;
        if height == 0 || Some(height) == tip {
            return Ok(self.make_view(Arc::clone(&state.cache), tip));
        }
        if height < self.config.start_height {
            return Ok(self.make_view(Arc::new(StakingCache::new()), Some(height)));
        }
        Err(StakingIndexError::HeightNotIndexed {
            requested: height,
            tip,
        })
    }

    /// Snapshot at the committed tip.
    pub fn tip(&self) -> Result<StakingView, StakingIndexError> {
        self.view(0)
    }

    fn make_view(&self, cache: Arc<StakingCache>, height: Option<u64>) -> StakingView {
        StakingView::new(
            cache,
            height,
            self.config.contract_address,
            self.config.block_interval,
        )
    }

    pub fn bucket(&self, id: u64) -> Result<Option<Bucket>, StakingIndexError> {
        Ok(self.tip()?.bucket(id))
    }

    pub fn buckets(&self) -> Result<Vec<(u64, Bucket)>, StakingIndexError> {
        Ok(self.tip()?.buckets())
    }

    pub fn buckets_by_candidate(
        &self,
        candidate: &Candidate,
    ) -> Result<Vec<(u64, Bucket)>, StakingIndexError> {
        Ok(self.tip()?.buckets_by_candidate(candidate))
    }

    pub fn buckets_by_indices(&self, ids: &[u64]) -> Result<Vec<Option<Bucket>>, StakingIndexError> {
        Ok(self.tip()?.buckets_by_indices(ids))
    }

    pub fn total_bucket_count(&self) -> Result<u64, StakingIndexError> {
        Ok(self.tip()?.total_bucket_count())
    }

    pub fn bucket_type(&self, id: u64) -> Result<Option<BucketType>, StakingIndexError> {
        Ok(self.tip()?.bucket_type(id))
    }

    pub fn bucket_types(&self, active_only: bool) -> Result<Vec<(u64, BucketType)>, StakingIndexError> {
        Ok(self.tip()?.bucket_types(active_only))
    }

    pub fn bucket_type_count(&self) -> Result<u64, StakingIndexError> {
        Ok(self.tip()?.bucket_type_count())
    }

    pub fn vote_buckets_by_indices(
        &self,
        ids: &[u64],
    ) -> Result<Vec<Option<VoteBucket>>, StakingIndexError> {
        Ok(self.tip()?.vote_buckets_by_indices(ids))
    }

    pub fn vote_buckets_by_candidate(
        &self,
        candidate: &Candidate,
    ) -> Result<Vec<VoteBucket>, StakingIndexError> {
        Ok(self.tip()?.vote_buckets_by_candidate(candidate))
    }

    pub fn stats(&self) -> Result<IndexStats, StakingIndexError> {
        Ok(self.tip()?.stats())
    }
}

impl<KV, D> BlockIndexer for StakingIndexer<KV, D>
where
    KV: KeyValueStore,
    D: EventDecoder,
{
    fn start(&self) -> Result<(), StakingIndexError> {
        StakingIndexer::start(self)
    }

    fn stop(&self) -> Result<(), StakingIndexError> {
        StakingIndexer::stop(self)
    }

    fn put_block(&self, block: &IndexedBlock) -> Result<(), StakingIndexError> {
        StakingIndexer::put_block(self, block)
    }

    fn height(&self) -> Result<u64, StakingIndexError> {
        StakingIndexer::height(self)
    }

    fn start_height(&self) -> u64 {
        StakingIndexer::start_height(self)
    }
}
