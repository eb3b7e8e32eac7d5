//! # Batch Operations
//!
//! An [`Operation`] is one queued action against one alias. The variant
//! itself encodes which payload fields exist:
//!
//! | Kind           | value | comparand | expiry   |
//! |----------------|-------|-----------|----------|
//! | Get            |       |           |          |
//! | Put            | yes   |           | optional |
//! | Update         | yes   |           | optional |
//! | Remove         |       |           |          |
//! | CompareAndSwap | yes   | yes       | optional |
//! | GetAndUpdate   | yes   |           | optional |
//! | GetAndRemove   |       |           |          |
//! | RemoveIf       |       | yes       |          |
//! | NoOp           |       |           |          |
//!
//! `Get`, `Put`, `Update` and `Remove` work on both blob and integer entries;
//! the remaining kinds are blob-only and carry raw bytes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// The type of entry an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Blob,
    Integer,
}

/// A value stored in, or returned from, an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Blob(#[serde(with = "base64_bytes")] Vec<u8>),
    Integer(i64),
}

impl Value {
    pub fn entry_type(&self) -> EntryType {
        match self {
            Value::Blob(_) => EntryType::Blob,
            Value::Integer(_) => EntryType::Integer,
        }
    }
}

/// Discriminant of [`Operation`], reported back in every result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Get,
    Put,
    Update,
    Remove,
    CompareAndSwap,
    GetAndUpdate,
    GetAndRemove,
    RemoveIf,
    NoOp,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Get => "get",
            OperationKind::Put => "put",
            OperationKind::Update => "update",
            OperationKind::Remove => "remove",
            OperationKind::CompareAndSwap => "compare_and_swap",
            OperationKind::GetAndUpdate => "get_and_update",
            OperationKind::GetAndRemove => "get_and_remove",
            OperationKind::RemoveIf => "remove_if",
            OperationKind::NoOp => "no_op",
        };
        f.write_str(name)
    }
}

/// One queued action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Read the entry's value
    Get { alias: String, entry: EntryType },

    /// Create the entry; fails if it already exists
    Put {
        alias: String,
        value: Value,
        expiry: Option<SystemTime>,
    },

    /// Create or replace the entry
    Update {
        alias: String,
        value: Value,
        expiry: Option<SystemTime>,
    },

    /// Delete the entry
    Remove { alias: String, entry: EntryType },

    /// Replace the blob with `value` if its content equals `comparand`
    CompareAndSwap {
        alias: String,
        #[serde(with = "base64_bytes")]
        value: Vec<u8>,
        #[serde(with = "base64_bytes")]
        comparand: Vec<u8>,
        expiry: Option<SystemTime>,
    },

    /// Replace the blob and return its previous content
    GetAndUpdate {
        alias: String,
        #[serde(with = "base64_bytes")]
        value: Vec<u8>,
        expiry: Option<SystemTime>,
    },

    /// Delete the blob and return its previous content
    GetAndRemove { alias: String },

    /// Delete the blob if its content equals `comparand`
    RemoveIf {
        alias: String,
        #[serde(with = "base64_bytes")]
        comparand: Vec<u8>,
    },

    /// Occupies a slot without touching the store
    NoOp { alias: String },
}

impl Operation {
    pub fn alias(&self) -> &str {
        match self {
            Operation::Get { alias, .. }
            | Operation::Put { alias, .. }
            | Operation::Update { alias, .. }
            | Operation::Remove { alias, .. }
            | Operation::CompareAndSwap { alias, .. }
            | Operation::GetAndUpdate { alias, .. }
            | Operation::GetAndRemove { alias }
            | Operation::RemoveIf { alias, .. }
            | Operation::NoOp { alias } => alias,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Get { .. } => OperationKind::Get,
            Operation::Put { .. } => OperationKind::Put,
            Operation::Update { .. } => OperationKind::Update,
            Operation::Remove { .. } => OperationKind::Remove,
            Operation::CompareAndSwap { .. } => OperationKind::CompareAndSwap,
            Operation::GetAndUpdate { .. } => OperationKind::GetAndUpdate,
            Operation::GetAndRemove { .. } => OperationKind::GetAndRemove,
            Operation::RemoveIf { .. } => OperationKind::RemoveIf,
            Operation::NoOp { .. } => OperationKind::NoOp,
        }
    }

    /// The entry type targeted, `None` for `NoOp`.
    pub fn entry_type(&self) -> Option<EntryType> {
        match self {
            Operation::Get { entry, .. } | Operation::Remove { entry, .. } => Some(*entry),
            Operation::Put { value, .. } | Operation::Update { value, .. } => {
                Some(value.entry_type())
            }
            Operation::CompareAndSwap { .. }
            | Operation::GetAndUpdate { .. }
            | Operation::GetAndRemove { .. }
            | Operation::RemoveIf { .. } => Some(EntryType::Blob),
            Operation::NoOp { .. } => None,
        }
    }

    pub fn expiry(&self) -> Option<SystemTime> {
        match self {
            Operation::Put { expiry, .. }
            | Operation::Update { expiry, .. }
            | Operation::CompareAndSwap { expiry, .. }
            | Operation::GetAndUpdate { expiry, .. } => *expiry,
            _ => None,
        }
    }

    /// True when the operation carries a value to write.
    pub fn has_value(&self) -> bool {
        matches!(
            self,
            Operation::Put { .. }
                | Operation::Update { .. }
                | Operation::CompareAndSwap { .. }
                | Operation::GetAndUpdate { .. }
        )
    }
}

/// Blob payloads travel as base64 strings in JSON.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
