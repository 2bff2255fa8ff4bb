//! # Adapters Module
//!
//! - `memory`: in-memory key-value store (tests, embedding)
//! - `rocksdb_store`: RocksDB key-value store (feature `rocksdb`)
//! - `abi`: staking contract log decoder

pub mod abi;
pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_store;

pub use abi::StakingAbiDecoder;
pub use memory::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use rocksdb_store::{RocksDbConfig, RocksDbStore};
