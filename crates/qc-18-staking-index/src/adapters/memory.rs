use crate::domain::errors::KVStoreError;
use crate::domain::value_objects::Namespace;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use std::collections::{BTreeMap, HashMap};

/// In-memory key-value store for unit tests.
///
/// One ordered map per namespace. A namespace exists once anything has been
/// written to it, mirroring a column family that was never created.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKVStore {
    namespaces: HashMap<Namespace, BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held in `namespace`.
    pub fn len(&self, namespace: Namespace) -> usize {
        self.namespaces.get(&namespace).map_or(0, BTreeMap::len)
    }

    fn apply(&mut self, op: BatchOperation) {
        match op {
            BatchOperation::Put {
                namespace,
                key,
                value,
            } => {
                self.namespaces.entry(namespace).or_default().insert(key, value);
            }
            BatchOperation::Delete { namespace, key } => {
                self.namespaces.entry(namespace).or_default().remove(&key);
            }
        }
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, namespace: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self
            .namespaces
            .get(&namespace)
            .and_then(|ns| ns.get(key))
            .cloned())
    }

    fn put(&mut self, namespace: Namespace, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.apply(BatchOperation::put(namespace, key, value));
        Ok(())
    }

    fn delete(&mut self, namespace: Namespace, key: &[u8]) -> Result<(), KVStoreError> {
        self.apply(BatchOperation::delete(namespace, key));
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        // Single-threaded apply; nothing in between can fail.
        for op in operations {
            self.apply(op);
        }
        Ok(())
    }

    fn scan(&self, namespace: Namespace) -> ScanResult {
        let ns = self
            .namespaces
            .get(&namespace)
            .ok_or(KVStoreError::NamespaceNotFound {
                namespace: namespace.as_str(),
            })?;
        Ok(ns.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_kv_store() {
        let mut store = InMemoryKVStore::new();

        store.put(Namespace::Bucket, b"key1", b"value1").unwrap();
        store.put(Namespace::BucketType, b"key1", b"other").unwrap();

        assert_eq!(
            store.get(Namespace::Bucket, b"key1").unwrap(),
            Some(b"value1".to_vec())
        );
        assert_eq!(
            store.get(Namespace::BucketType, b"key1").unwrap(),
            Some(b"other".to_vec())
        );
        assert_eq!(store.get(Namespace::Checkpoint, b"key1").unwrap(), None);

        store.delete(Namespace::Bucket, b"key1").unwrap();
        assert_eq!(store.get(Namespace::Bucket, b"key1").unwrap(), None);
    }

    #[test]
    fn test_scan_ordered_and_namespace_missing() {
        let mut store = InMemoryKVStore::new();
        assert_eq!(
            store.scan(Namespace::Bucket),
            Err(KVStoreError::NamespaceNotFound { namespace: "sbn" })
        );

        let ops = vec![
            BatchOperation::put(Namespace::Bucket, vec![0, 2], b"2".to_vec()),
            BatchOperation::put(Namespace::Bucket, vec![0, 1], b"1".to_vec()),
            BatchOperation::put(Namespace::Checkpoint, b"shk".to_vec(), b"h".to_vec()),
        ];
        store.atomic_batch_write(ops).unwrap();

        let rows = store.scan(Namespace::Bucket).unwrap();
        assert_eq!(
            rows,
            vec![(vec![0, 1], b"1".to_vec()), (vec![0, 2], b"2".to_vec())]
        );
        assert_eq!(store.len(Namespace::Checkpoint), 1);
    }
}
