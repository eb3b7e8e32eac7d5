//! # Storage Engine Trait
//!
//! Common interface for the engines behind a [`Store`](super::Store). The
//! engine only keeps entries; every rule about aliases, types, expiry and
//! comparands lives in the store's executor.
//!
//! ## Implementations
//!
//! - `MemoryEngine`: in-memory storage on `RwLock<HashMap>`
//! - `SledEngine`: persistent storage in a sled tree

use crate::operation::{EntryType, Value};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// An entry as kept by an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: Value,
    pub expiry: Option<SystemTime>,
}

impl StoredEntry {
    pub fn new(value: Value, expiry: Option<SystemTime>) -> Self {
        Self { value, expiry }
    }

    pub fn entry_type(&self) -> EntryType {
        self.value.entry_type()
    }

    /// An entry whose expiry is at or before `now` no longer exists.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        matches!(self.expiry, Some(at) if at <= now)
    }
}

/// Storage backend for entries, keyed by alias.
///
/// All engines are shared between connections and must be `Send + Sync`.
pub trait StoreEngine: Send + Sync {
    /// Look up an entry. Expired entries are returned as stored.
    fn get(&self, alias: &str) -> Result<Option<StoredEntry>>;

    /// Store an entry, replacing whatever was there.
    fn insert(&self, alias: String, entry: StoredEntry) -> Result<()>;

    /// Delete an entry and return it.
    fn remove(&self, alias: &str) -> Result<Option<StoredEntry>>;

    /// Number of stored entries, expired ones included.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
