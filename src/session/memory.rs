//! In-process session backed by a [`Store`].

use super::{Session, SubmittedBatch};
use crate::batch::NativeBuffer;
use crate::error::Result;
use crate::operation::{Operation, OperationKind};
use crate::store::{MemoryEngine, Store};
use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts result buffers handed out and given back.
#[derive(Debug, Default)]
struct BufferLedger {
    allocated: AtomicUsize,
    released: AtomicUsize,
}

struct TrackedBuffer {
    ledger: Arc<BufferLedger>,
}

impl NativeBuffer for TrackedBuffer {
    fn release(self: Box<Self>) {
        self.ledger.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Runs batches directly against a store in the same process.
///
/// Every batch gets a tracked result buffer, so tests can check that each
/// one is released exactly once.
///
/// # Example
///
/// ```rust
/// use qdb_client::{Batch, MemorySession};
/// use std::sync::Arc;
///
/// let session = Arc::new(MemorySession::new());
/// let mut batch = Batch::new(session.clone());
/// batch.integer("counter").put(1, None).unwrap();
/// batch.run().unwrap();
/// batch.close();
/// assert_eq!(session.outstanding_buffers(), 0);
/// ```
pub struct MemorySession {
    store: Store,
    ledger: Arc<BufferLedger>,
}

impl MemorySession {
    /// A session over an empty in-memory store.
    pub fn new() -> Self {
        Self::with_store(Store::new(Box::new(MemoryEngine::new())))
    }

    pub fn with_store(store: Store) -> Self {
        Self {
            store,
            ledger: Arc::new(BufferLedger::default()),
        }
    }

    /// Refuse operations of the given kinds, as a store with those
    /// operations turned off would.
    pub fn with_disabled(self, kinds: impl IntoIterator<Item = OperationKind>) -> Self {
        Self {
            store: self.store.with_disabled(kinds),
            ledger: self.ledger,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Buffers handed out and not yet released.
    pub fn outstanding_buffers(&self) -> usize {
        self.allocated_buffers()
            .saturating_sub(self.released_buffers())
    }

    pub fn allocated_buffers(&self) -> usize {
        self.ledger.allocated.load(Ordering::SeqCst)
    }

    pub fn released_buffers(&self) -> usize {
        self.ledger.released.load(Ordering::SeqCst)
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for MemorySession {
    fn submit_batch(&self, operations: &[Operation]) -> Result<SubmittedBatch> {
        let (success_count, results) = self.store.execute(operations);

        self.ledger.allocated.fetch_add(1, Ordering::SeqCst);
        debug!("allocated result buffer for {} operations", results.len());

        Ok(SubmittedBatch {
            success_count,
            results,
            buffer: Some(Box::new(TrackedBuffer {
                ledger: Arc::clone(&self.ledger),
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_code::ErrorCode;

    #[test]
    fn each_submission_allocates_a_buffer() {
        let session = MemorySession::new();
        let first = session.submit_batch(&[]).unwrap();
        let second = session
            .submit_batch(&[Operation::NoOp { alias: "a".into() }])
            .unwrap();
        assert_eq!(session.outstanding_buffers(), 2);

        for submitted in [first, second] {
            if let Some(buffer) = submitted.buffer {
                buffer.release();
            }
        }
        assert_eq!(session.outstanding_buffers(), 0);
        assert_eq!(session.released_buffers(), 2);
    }

    #[test]
    fn results_are_not_classified() {
        let session = MemorySession::new();
        let submitted = session
            .submit_batch(&[Operation::GetAndRemove { alias: "missing".into() }])
            .unwrap();
        assert_eq!(submitted.success_count, 0);
        assert_eq!(submitted.results[0].code, ErrorCode::ALIAS_NOT_FOUND);
        if let Some(buffer) = submitted.buffer {
            buffer.release();
        }
    }
}
