//! # Value Objects
//!
//! Configuration and persisted key layout for the staking index.

use super::entities::Address;
use std::fmt;
use std::time::Duration;

/// Default block interval used to turn durations in blocks into time.
pub const DEFAULT_BLOCK_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for the staking indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakingIndexConfig {
    /// Address of the watched staking contract.
    pub contract_address: Address,
    /// First height at which the contract is watched.
    pub start_height: u64,
    /// Block production interval (duration in blocks -> wall-clock).
    pub block_interval: Duration,
}

impl Default for StakingIndexConfig {
    fn default() -> Self {
        Self {
            contract_address: Address::ZERO,
            start_height: 0,
            block_interval: DEFAULT_BLOCK_INTERVAL,
        }
    }
}

impl StakingIndexConfig {
    pub fn new(contract_address: Address, start_height: u64) -> Self {
        Self {
            contract_address,
            start_height,
            ..Default::default()
        }
    }

    /// Set the watched contract address.
    pub fn with_contract_address(mut self, address: Address) -> Self {
        self.contract_address = address;
        self
    }

    /// Set the height the contract was deployed at.
    pub fn with_start_height(mut self, height: u64) -> Self {
        self.start_height = height;
        self
    }

    /// Set the block interval.
    pub fn with_block_interval(mut self, interval: Duration) -> Self {
        self.block_interval = interval;
        self
    }

    /// Reject configurations the indexer cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contract_address.is_zero() {
            return Err(ConfigError::ZeroContractAddress);
        }
        if self.block_interval.is_zero() {
            return Err(ConfigError::ZeroBlockInterval);
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("contract address must not be the zero address")]
    ZeroContractAddress,
    #[error("block interval must be non-zero")]
    ZeroBlockInterval,
}

/// Namespaces of the key-value store.
///
/// | Namespace | Key | Value |
/// |-----------|-----|-------|
/// | `sns` | checkpoint keys below | big-endian u64 / address |
/// | `sbt` | bucket type id (BE u64) | bucket type record |
/// | `sbn` | token id (BE u64) | bucket record |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Checkpoint,
    BucketType,
    Bucket,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [Namespace::Checkpoint, Namespace::BucketType, Namespace::Bucket];

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Checkpoint => "sns",
            Namespace::BucketType => "sbt",
            Namespace::Bucket => "sbn",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys of the checkpoint namespace.
pub mod checkpoint_keys {
    /// Last committed block height.
    pub const HEIGHT: &[u8] = b"shk";
    /// Buckets ever staked, burned ones included.
    pub const TOTAL_BUCKET_COUNT: &[u8] = b"stbck";
    /// Highest token id ever staked; absent until the first `Staked`.
    pub const HIGHEST_BUCKET_ID: &[u8] = b"shbid";
    /// Address of the contract the store was built for.
    pub const CONTRACT_ADDRESS: &[u8] = b"sca";
}

/// Big-endian key for a u64 id, so keys sort numerically.
pub fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder_and_validation() {
        let config = StakingIndexConfig::default();
        assert_eq!(config.validate(), Err(ConfigError::ZeroContractAddress));

        let config = config
            .with_contract_address(Address::new([1; 20]))
            .with_start_height(100)
            .with_block_interval(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroBlockInterval));

        let config = config.with_block_interval(Duration::from_secs(5));
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.start_height, 100);
    }

    #[test]
    fn test_id_keys_sort_numerically() {
        let mut keys = vec![id_key(256), id_key(1), id_key(255)];
        keys.sort();
        assert_eq!(keys, vec![id_key(1), id_key(255), id_key(256)]);
    }

    #[test]
    fn test_namespaces_distinct() {
        let names: std::collections::HashSet<_> =
            Namespace::ALL.iter().map(Namespace::as_str).collect();
        assert_eq!(names.len(), Namespace::ALL.len());
    }
}
