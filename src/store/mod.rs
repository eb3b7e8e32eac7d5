//! # Storage Module
//!
//! The store that answers batches, used in-process by `MemorySession` and
//! over TCP by the reference server:
//!
//! - **`engine`**: the `StoreEngine` interface and the stored entry shape
//! - **`memory_engine`**: in-memory storage on `RwLock<HashMap>`
//! - **`sled_engine`**: persistent storage in sled
//! - **`executor`**: the `Store`, which applies operations and assigns codes
//!
//! Engines are interchangeable; the rules of the store live only in the
//! executor.

pub mod engine;
pub mod executor;
pub mod memory_engine;
pub mod sled_engine;

pub use engine::{StoreEngine, StoredEntry};
pub use executor::{Store, MAX_ALIAS_LENGTH, MAX_ENTRY_SIZE, RESERVED_PREFIX};
pub use memory_engine::MemoryEngine;
pub use sled_engine::SledEngine;
