//! # RocksDB Storage Adapter
//!
//! Production implementation of [`KeyValueStore`], one column family per
//! [`Namespace`]:
//!
//! - `sns` - checkpoint (height, counters, contract address)
//! - `sbt` - bucket types
//! - `sbn` - buckets
//!
//! A block's records and checkpoint land in one `WriteBatch`.

use crate::domain::errors::KVStoreError;
use crate::domain::value_objects::Namespace;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use parking_lot::RwLock;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;

/// RocksDB configuration
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// Maximum number of write buffers (default: 3)
    pub max_write_buffer_number: i32,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/staking-index".to_string(),
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            max_write_buffer_number: 3,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            max_write_buffer_number: 2,
            sync_writes: false,
        }
    }
}

/// RocksDB-backed key-value store
pub struct RocksDbStore {
    db: RwLock<DB>,
    config: RocksDbConfig,
}

impl RocksDbStore {
    /// Open or create the database with every namespace's column family.
    pub fn open(config: RocksDbConfig) -> Result<Self, KVStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = Namespace::ALL
            .iter()
            .map(|ns| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
                ColumnFamilyDescriptor::new(ns.as_str(), cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors).map_err(|e| {
            KVStoreError::IOError {
                message: format!("Failed to open RocksDB: {}", e),
            }
        })?;

        Ok(Self {
            db: RwLock::new(db),
            config,
        })
    }

    /// Open at `path` with default tuning.
    pub fn open_default(path: impl AsRef<Path>) -> Result<Self, KVStoreError> {
        Self::open(RocksDbConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        })
    }

    fn write_opts(&self) -> rocksdb::WriteOptions {
        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        write_opts
    }
}

fn cf<'a>(db: &'a DB, namespace: Namespace) -> Result<&'a ColumnFamily, KVStoreError> {
    db.cf_handle(namespace.as_str())
        .ok_or(KVStoreError::NamespaceNotFound {
            namespace: namespace.as_str(),
        })
}

fn io_error(op: &str, e: rocksdb::Error) -> KVStoreError {
    KVStoreError::IOError {
        message: format!("RocksDB {} failed: {}", op, e),
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, namespace: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        let db = self.db.read();
        db.get_cf(cf(&db, namespace)?, key)
            .map_err(|e| io_error("get", e))
    }

    fn put(&mut self, namespace: Namespace, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        let db = self.db.write();
        db.put_cf_opt(cf(&db, namespace)?, key, value, &self.write_opts())
            .map_err(|e| io_error("put", e))
    }

    fn delete(&mut self, namespace: Namespace, key: &[u8]) -> Result<(), KVStoreError> {
        let db = self.db.write();
        db.delete_cf_opt(cf(&db, namespace)?, key, &self.write_opts())
            .map_err(|e| io_error("delete", e))
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let db = self.db.write();
        let mut batch = WriteBatch::default();

        for op in operations {
            match op {
                BatchOperation::Put {
                    namespace,
                    key,
                    value,
                } => batch.put_cf(cf(&db, namespace)?, &key, &value),
                BatchOperation::Delete { namespace, key } => {
                    batch.delete_cf(cf(&db, namespace)?, &key)
                }
            }
        }

        db.write_opt(batch, &self.write_opts())
            .map_err(|e| io_error("batch write", e))
    }

    fn scan(&self, namespace: Namespace) -> ScanResult {
        let db = self.db.read();
        let mut results = Vec::new();
        for item in db.iterator_cf(cf(&db, namespace)?, IteratorMode::Start) {
            let (key, value) = item.map_err(|e| io_error("scan", e))?;
            results.push((key.to_vec(), value.to_vec()));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (RocksDbStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = RocksDbConfig::for_testing(dir.path().to_string_lossy().to_string());
        (RocksDbStore::open(config).unwrap(), dir)
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let (mut store, _dir) = open_temp();
        store.put(Namespace::Bucket, b"k", b"bucket").unwrap();
        store.put(Namespace::BucketType, b"k", b"type").unwrap();

        assert_eq!(
            store.get(Namespace::Bucket, b"k").unwrap(),
            Some(b"bucket".to_vec())
        );
        assert_eq!(
            store.get(Namespace::BucketType, b"k").unwrap(),
            Some(b"type".to_vec())
        );
        assert_eq!(store.get(Namespace::Checkpoint, b"k").unwrap(), None);
    }

    #[test]
    fn test_batch_and_ordered_scan() {
        let (mut store, _dir) = open_temp();
        store
            .atomic_batch_write(vec![
                BatchOperation::put(Namespace::Bucket, 2u64.to_be_bytes(), b"b".to_vec()),
                BatchOperation::put(Namespace::Bucket, 1u64.to_be_bytes(), b"a".to_vec()),
                BatchOperation::put(Namespace::Bucket, 3u64.to_be_bytes(), b"c".to_vec()),
                BatchOperation::delete(Namespace::Bucket, 3u64.to_be_bytes()),
            ])
            .unwrap();

        let values: Vec<Vec<u8>> = store
            .scan(Namespace::Bucket)
            .unwrap()
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        assert_eq!(values, vec![b"a".to_vec(), b"b".to_vec()]);
        assert!(store.scan(Namespace::Checkpoint).unwrap().is_empty());
    }

    #[test]
    fn test_reopen_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_string_lossy().to_string();
        {
            let mut store = RocksDbStore::open(RocksDbConfig::for_testing(path.clone())).unwrap();
            store.put(Namespace::Checkpoint, b"shk", &7u64.to_be_bytes()).unwrap();
        }
        let store = RocksDbStore::open(RocksDbConfig::for_testing(path)).unwrap();
        assert_eq!(
            store.get(Namespace::Checkpoint, b"shk").unwrap(),
            Some(7u64.to_be_bytes().to_vec())
        );
    }
}
