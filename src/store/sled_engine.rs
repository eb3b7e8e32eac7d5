// src/store/sled_engine.rs
use super::engine::{StoreEngine, StoredEntry};
use anyhow::Result;
use sled::{Db, IVec, Tree};

/// Persistent engine: one sled tree, entries encoded with bincode.
pub struct SledEngine {
    _db: Db,
    tree: Tree,
}

impl SledEngine {
    pub fn new(storage_path: &str) -> Result<Self> {
        let db = sled::open(storage_path)?;
        let tree = db.open_tree(b"qdb_entries")?;
        Ok(Self { _db: db, tree })
    }

    fn decode(bytes: Option<IVec>) -> Result<Option<StoredEntry>> {
        match bytes {
            Some(raw) => Ok(Some(bincode::deserialize(&raw)?)),
            None => Ok(None),
        }
    }
}

impl StoreEngine for SledEngine {
    fn get(&self, alias: &str) -> Result<Option<StoredEntry>> {
        Self::decode(self.tree.get(alias)?)
    }

    fn insert(&self, alias: String, entry: StoredEntry) -> Result<()> {
        let raw = bincode::serialize(&entry)?;
        self.tree.insert(alias.as_bytes(), raw)?;
        Ok(())
    }

    fn remove(&self, alias: &str) -> Result<Option<StoredEntry>> {
        Self::decode(self.tree.remove(alias)?)
    }

    fn len(&self) -> usize {
        self.tree.len()
    }
}
