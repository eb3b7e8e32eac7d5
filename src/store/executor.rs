//! # Batch Executor
//!
//! Applies a batch of operations to an engine and answers each one with a
//! raw status code, the way a remote node does. Batches are applied one at
//! a time, in submission order.
//!
//! Rules applied before an operation reaches the engine:
//! - the alias must be non-empty, at most `MAX_ALIAS_LENGTH` bytes and
//!   outside the reserved `qdb` namespace
//! - the operation kind must not be disabled
//! - an expiry must lie in the future
//! - a blob must not exceed `MAX_ENTRY_SIZE` bytes

use super::engine::{StoreEngine, StoredEntry};
use crate::batch::OperationResult;
use crate::error_code::ErrorCode;
use crate::operation::{Operation, OperationKind, Value};
use anyhow::Result;
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

/// Aliases starting with this prefix belong to the store itself.
pub const RESERVED_PREFIX: &str = "qdb";

pub const MAX_ALIAS_LENGTH: usize = 1024;

pub const MAX_ENTRY_SIZE: usize = 64 * 1024 * 1024;

/// An engine plus the rules of the remote store.
pub struct Store {
    engine: Box<dyn StoreEngine>,
    disabled: HashSet<OperationKind>,
    // serializes batches so read-modify-write kinds see a stable entry
    batch_lock: Mutex<()>,
}

impl Store {
    pub fn new(engine: Box<dyn StoreEngine>) -> Self {
        Self {
            engine,
            disabled: HashSet::new(),
            batch_lock: Mutex::new(()),
        }
    }

    /// Refuse operations of the given kinds with `OPERATION_DISABLED`.
    pub fn with_disabled(mut self, kinds: impl IntoIterator<Item = OperationKind>) -> Self {
        self.disabled.extend(kinds);
        self
    }

    pub fn engine(&self) -> &dyn StoreEngine {
        self.engine.as_ref()
    }

    /// Apply `operations` in order. Returns the number of successes and one
    /// result per operation, index for index.
    pub fn execute(&self, operations: &[Operation]) -> (usize, Vec<OperationResult>) {
        let _guard = self.batch_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let now = SystemTime::now();

        let results: Vec<OperationResult> =
            operations.iter().map(|op| self.apply(op, now)).collect();
        let success_count = results.iter().filter(|r| r.is_success()).count();

        debug!(
            "executed batch: {}/{} operations succeeded",
            success_count,
            results.len()
        );
        (success_count, results)
    }

    fn apply(&self, op: &Operation, now: SystemTime) -> OperationResult {
        let reply = OperationResult::new(op.alias(), op.kind(), ErrorCode::OK);

        if let Some(code) = self.reject(op, now) {
            return OperationResult { code, ..reply };
        }

        match self.run_operation(op, now) {
            Ok((code, value)) => OperationResult {
                code,
                value,
                ..reply
            },
            Err(e) => {
                warn!("{} on '{}' failed in the engine: {}", op.kind(), op.alias(), e);
                OperationResult::new(op.alias(), op.kind(), ErrorCode::INTERNAL_REMOTE)
                    .with_message(e.to_string())
            }
        }
    }

    fn reject(&self, op: &Operation, now: SystemTime) -> Option<ErrorCode> {
        let alias = op.alias();
        if alias.is_empty() {
            return Some(ErrorCode::INVALID_ARGUMENT);
        }
        if alias.len() > MAX_ALIAS_LENGTH {
            return Some(ErrorCode::ALIAS_TOO_LONG);
        }
        if alias.starts_with(RESERVED_PREFIX) {
            return Some(ErrorCode::RESERVED_ALIAS);
        }
        if self.disabled.contains(&op.kind()) {
            return Some(ErrorCode::OPERATION_DISABLED);
        }
        if matches!(op.expiry(), Some(at) if at <= now) {
            return Some(ErrorCode::OUT_OF_BOUNDS);
        }
        if written_size(op) > MAX_ENTRY_SIZE {
            return Some(ErrorCode::ENTRY_TOO_LARGE);
        }
        None
    }

    /// Current entry for `alias`, dropping it if it expired.
    fn live_entry(&self, alias: &str, now: SystemTime) -> Result<Option<StoredEntry>> {
        match self.engine.get(alias)? {
            Some(entry) if entry.is_expired(now) => {
                self.engine.remove(alias)?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn run_operation(
        &self,
        op: &Operation,
        now: SystemTime,
    ) -> Result<(ErrorCode, Option<Value>)> {
        if let Operation::NoOp { .. } = op {
            return Ok((ErrorCode::OK, None));
        }

        let current = self.live_entry(op.alias(), now)?;
        if let (Some(entry), Some(expected)) = (&current, op.entry_type()) {
            if entry.entry_type() != expected {
                return Ok((ErrorCode::INCOMPATIBLE_TYPE, None));
            }
        }

        let outcome = match (op, current) {
            (Operation::NoOp { .. }, _) => (ErrorCode::OK, None),

            (
                Operation::Get { .. }
                | Operation::Remove { .. }
                | Operation::CompareAndSwap { .. }
                | Operation::GetAndUpdate { .. }
                | Operation::GetAndRemove { .. }
                | Operation::RemoveIf { .. },
                None,
            ) => (ErrorCode::ALIAS_NOT_FOUND, None),

            (Operation::Get { .. }, Some(entry)) => (ErrorCode::OK, Some(entry.value)),

            (Operation::Put { .. }, Some(_)) => (ErrorCode::ALIAS_ALREADY_EXISTS, None),

            (Operation::Put { alias, value, expiry }, None) => {
                self.engine
                    .insert(alias.clone(), StoredEntry::new(value.clone(), *expiry))?;
                (ErrorCode::OK, None)
            }

            (Operation::Update { alias, value, expiry }, existing) => {
                self.engine
                    .insert(alias.clone(), StoredEntry::new(value.clone(), *expiry))?;
                match existing {
                    Some(_) => (ErrorCode::OK, None),
                    None => (ErrorCode::OK_CREATED, None),
                }
            }

            (Operation::Remove { alias, .. }, Some(_)) => {
                self.engine.remove(alias)?;
                (ErrorCode::OK, None)
            }

            (
                Operation::CompareAndSwap {
                    alias,
                    value,
                    comparand,
                    expiry,
                },
                Some(entry),
            ) => {
                if blob_equals(&entry.value, comparand) {
                    let swapped = StoredEntry::new(Value::Blob(value.clone()), *expiry);
                    self.engine.insert(alias.clone(), swapped)?;
                    (ErrorCode::OK, None)
                } else {
                    (ErrorCode::UNMATCHED_CONTENT, Some(entry.value))
                }
            }

            (Operation::GetAndUpdate { alias, value, expiry }, Some(entry)) => {
                let updated = StoredEntry::new(Value::Blob(value.clone()), *expiry);
                self.engine.insert(alias.clone(), updated)?;
                (ErrorCode::OK, Some(entry.value))
            }

            (Operation::GetAndRemove { alias }, Some(entry)) => {
                self.engine.remove(alias)?;
                (ErrorCode::OK, Some(entry.value))
            }

            (Operation::RemoveIf { alias, comparand }, Some(entry)) => {
                if blob_equals(&entry.value, comparand) {
                    self.engine.remove(alias)?;
                    (ErrorCode::OK, None)
                } else {
                    (ErrorCode::UNMATCHED_CONTENT, None)
                }
            }
        };

        Ok(outcome)
    }
}

fn blob_equals(value: &Value, comparand: &[u8]) -> bool {
    matches!(value, Value::Blob(content) if content.as_slice() == comparand)
}

fn written_size(op: &Operation) -> usize {
    match op {
        Operation::Put { value, .. } | Operation::Update { value, .. } => match value {
            Value::Blob(content) => content.len(),
            Value::Integer(_) => std::mem::size_of::<i64>(),
        },
        Operation::CompareAndSwap { value, .. } | Operation::GetAndUpdate { value, .. } => {
            value.len()
        }
        _ => 0,
    }
}
