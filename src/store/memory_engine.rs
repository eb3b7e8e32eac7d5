//! # In-Memory Storage Engine
//!
//! Thread-safe in-memory engine on `RwLock<HashMap<String, StoredEntry>>`:
//! readers proceed concurrently, writers take the lock exclusively.
//!
//! **Note**: nothing is persisted. All entries are lost when the engine is
//! dropped.

use super::engine::{StoreEngine, StoredEntry};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Clone, Default)]
pub struct MemoryEngine {
    data: Arc<RwLock<HashMap<String, StoredEntry>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("memory engine lock poisoned")
}

impl StoreEngine for MemoryEngine {
    fn get(&self, alias: &str) -> Result<Option<StoredEntry>> {
        let data = self.data.read().map_err(poisoned)?;
        Ok(data.get(alias).cloned())
    }

    fn insert(&self, alias: String, entry: StoredEntry) -> Result<()> {
        let mut data = self.data.write().map_err(poisoned)?;
        data.insert(alias, entry);
        Ok(())
    }

    fn remove(&self, alias: &str) -> Result<Option<StoredEntry>> {
        let mut data = self.data.write().map_err(poisoned)?;
        Ok(data.remove(alias))
    }

    fn len(&self) -> usize {
        self.data.read().map(|data| data.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Value;
    use std::thread;

    #[test]
    fn insert_get_remove() {
        let engine = MemoryEngine::new();
        assert!(engine.is_empty());

        let entry = StoredEntry::new(Value::Blob(b"v".to_vec()), None);
        engine.insert("a".into(), entry.clone()).unwrap();
        assert_eq!(engine.get("a").unwrap(), Some(entry.clone()));
        assert_eq!(engine.len(), 1);

        assert_eq!(engine.remove("a").unwrap(), Some(entry));
        assert_eq!(engine.get("a").unwrap(), None);
        assert_eq!(engine.remove("a").unwrap(), None);
    }

    #[test]
    fn concurrent_writers() {
        let engine = MemoryEngine::new();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let engine = engine.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        let entry = StoredEntry::new(Value::Integer(i), None);
                        engine.insert(format!("t{}:{}", t, i), entry).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(engine.len(), 800);
    }
}
