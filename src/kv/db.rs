use crate::error::StoreError;
use crate::trie::node::Hash256;
use sled::{Db, Tree};
use std::collections::HashMap;

/// Content-addressed node storage: keys are digests of the stored bytes, so
/// puts are idempotent (same digest implies same bytes).
pub trait NodeStore {
    fn get(&self, key: &Hash256) -> Result<Option<Vec<u8>>, StoreError>;
    fn put(&mut self, key: Hash256, value: Vec<u8>) -> Result<(), StoreError>;
    fn flush(&self) -> Result<(), StoreError>;
}

/// Durable store backed by a sled tree.
#[derive(Debug)]
pub struct SledDb {
    tree: Tree,
}

impl SledDb {
    pub fn open(path: impl AsRef<std::path::Path>, tree_name: &str) -> Result<Self, StoreError> {
        let db: Db = sled::open(path)?;
        let tree = db.open_tree(tree_name.as_bytes())?;
        Ok(Self { tree })
    }
}

impl NodeStore for SledDb {
    fn get(&self, key: &Hash256) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tree.get(key)?.map(|ivec| ivec.to_vec()))
    }

    fn put(&mut self, key: Hash256, value: Vec<u8>) -> Result<(), StoreError> {
        log::trace!("store put {}", hex::encode(key));
        self.tree.insert(key, value)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.tree.flush()?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral tries.
#[derive(Debug, Default, Clone)]
pub struct MemoryDb {
    nodes: HashMap<Hash256, Vec<u8>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeStore for MemoryDb {
    fn get(&self, key: &Hash256) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.nodes.get(key).cloned())
    }

    fn put(&mut self, key: Hash256, value: Vec<u8>) -> Result<(), StoreError> {
        self.nodes.insert(key, value);
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::trie::node::keccak256;

    #[test]
    fn memory_db_roundtrip() {
        let mut db = MemoryDb::new();
        let bytes = b"node bytes".to_vec();
        let digest = keccak256(&bytes);

        assert_eq!(db.get(&digest).unwrap(), None);
        db.put(digest, bytes.clone()).unwrap();
        assert_eq!(db.get(&digest).unwrap(), Some(bytes));
    }

    #[test]
    fn memory_db_put_is_idempotent() {
        let mut db = MemoryDb::new();
        let bytes = b"same".to_vec();
        let digest = keccak256(&bytes);

        db.put(digest, bytes.clone()).unwrap();
        db.put(digest, bytes.clone()).unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.get(&digest).unwrap(), Some(bytes));
    }

    #[test]
    fn backend_errors_keep_their_source() {
        let err: StoreError = sled::Error::Unsupported("read-only".to_string()).into();
        let source = std::error::Error::source(&err).expect("backend error must carry a source");
        assert!(source.downcast_ref::<sled::Error>().is_some());
    }

    #[test]
    fn sled_db_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = SledDb::open(dir.path(), "nodes").unwrap();

        let bytes = b"persisted node".to_vec();
        let digest = keccak256(&bytes);

        db.put(digest, bytes.clone()).unwrap();
        db.flush().unwrap();
        assert_eq!(db.get(&digest).unwrap(), Some(bytes));
    }
}
