//! Typed builders returned by `Batch::blob` and `Batch::integer`.

use super::{Batch, Future};
use crate::error::Result;
use crate::operation::{EntryType, Operation, Value};
use std::time::SystemTime;

/// Queues one operation against a blob alias.
pub struct BlobBatch<'a> {
    batch: &'a mut Batch,
    alias: String,
}

impl<'a> BlobBatch<'a> {
    pub(super) fn new(batch: &'a mut Batch, alias: String) -> Self {
        Self { batch, alias }
    }

    /// Read the blob's content.
    pub fn get(self) -> Result<Future<Vec<u8>>> {
        self.batch.append(Operation::Get {
            alias: self.alias,
            entry: EntryType::Blob,
        })
    }

    /// Create the blob. Fails with `AliasAlreadyExists` if it exists.
    pub fn put(self, content: impl Into<Vec<u8>>, expiry: Option<SystemTime>) -> Result<Future<()>> {
        self.batch.append(Operation::Put {
            alias: self.alias,
            value: Value::Blob(content.into()),
            expiry,
        })
    }

    /// Create or replace the blob.
    pub fn update(
        self,
        content: impl Into<Vec<u8>>,
        expiry: Option<SystemTime>,
    ) -> Result<Future<()>> {
        self.batch.append(Operation::Update {
            alias: self.alias,
            value: Value::Blob(content.into()),
            expiry,
        })
    }

    pub fn remove(self) -> Result<Future<()>> {
        self.batch.append(Operation::Remove {
            alias: self.alias,
            entry: EntryType::Blob,
        })
    }

    /// Swap in `content` if the blob currently equals `comparand`.
    ///
    /// The future yields `None` when the swap happened and the current
    /// content when it did not.
    pub fn compare_and_swap(
        self,
        content: impl Into<Vec<u8>>,
        comparand: impl Into<Vec<u8>>,
        expiry: Option<SystemTime>,
    ) -> Result<Future<Option<Vec<u8>>>> {
        self.batch.append(Operation::CompareAndSwap {
            alias: self.alias,
            value: content.into(),
            comparand: comparand.into(),
            expiry,
        })
    }

    /// Replace the blob; the future yields the previous content.
    pub fn get_and_update(
        self,
        content: impl Into<Vec<u8>>,
        expiry: Option<SystemTime>,
    ) -> Result<Future<Vec<u8>>> {
        self.batch.append(Operation::GetAndUpdate {
            alias: self.alias,
            value: content.into(),
            expiry,
        })
    }

    /// Remove the blob; the future yields the content it held.
    pub fn get_and_remove(self) -> Result<Future<Vec<u8>>> {
        self.batch.append(Operation::GetAndRemove { alias: self.alias })
    }

    /// Remove the blob if it equals `comparand`; the future yields whether it
    /// was removed.
    pub fn remove_if(self, comparand: impl Into<Vec<u8>>) -> Result<Future<bool>> {
        self.batch.append(Operation::RemoveIf {
            alias: self.alias,
            comparand: comparand.into(),
        })
    }
}

/// Queues one operation against an integer alias.
pub struct IntegerBatch<'a> {
    batch: &'a mut Batch,
    alias: String,
}

impl<'a> IntegerBatch<'a> {
    pub(super) fn new(batch: &'a mut Batch, alias: String) -> Self {
        Self { batch, alias }
    }

    pub fn get(self) -> Result<Future<i64>> {
        self.batch.append(Operation::Get {
            alias: self.alias,
            entry: EntryType::Integer,
        })
    }

    pub fn put(self, value: i64, expiry: Option<SystemTime>) -> Result<Future<()>> {
        self.batch.append(Operation::Put {
            alias: self.alias,
            value: Value::Integer(value),
            expiry,
        })
    }

    pub fn update(self, value: i64, expiry: Option<SystemTime>) -> Result<Future<()>> {
        self.batch.append(Operation::Update {
            alias: self.alias,
            value: Value::Integer(value),
            expiry,
        })
    }

    pub fn remove(self) -> Result<Future<()>> {
        self.batch.append(Operation::Remove {
            alias: self.alias,
            entry: EntryType::Integer,
        })
    }
}
