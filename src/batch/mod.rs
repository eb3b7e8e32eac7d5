//! # Batches
//!
//! A [`Batch`] queues operations against any number of aliases, submits them
//! to the session in one round trip and keeps the results until it is
//! closed. Each append returns a [`Future`] bound to the operation's index.
//!
//! ## Lifecycle
//!
//! ```text
//! Building --run()--> Run --close()--> Closed
//!     \_______________close()_________/^
//! ```
//!
//! Appends are only accepted while `Building`. Results can only be read
//! while `Run`. `close()` is valid in every state, may be called any number
//! of times, and releases the result buffer on its first call. A batch that
//! is dropped without being closed closes itself.

mod builder;
mod future;
mod result;

pub use builder::{BlobBatch, IntegerBatch};
pub use future::{FromResult, Future};
pub use result::{BatchResult, NativeBuffer, OperationResult};

use crate::error::{Error, Result};
use crate::operation::Operation;
use crate::session::Session;
use log::debug;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Public view of a batch's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Building,
    Run,
    Closed,
}

/// State shared between a batch and its futures.
pub(crate) enum BatchState {
    Building,
    Run(BatchResult),
    Closed,
}

impl BatchState {
    fn status(&self) -> BatchStatus {
        match self {
            BatchState::Building => BatchStatus::Building,
            BatchState::Run(_) => BatchStatus::Run,
            BatchState::Closed => BatchStatus::Closed,
        }
    }
}

// A panic while holding the lock cannot leave the state half-updated: every
// write is a single assignment. Poisoning is therefore ignored.
pub(crate) fn read_state(state: &RwLock<BatchState>) -> RwLockReadGuard<'_, BatchState> {
    state.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_state(state: &RwLock<BatchState>) -> RwLockWriteGuard<'_, BatchState> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}

/// An ordered set of operations submitted together.
///
/// # Example
///
/// ```rust
/// use qdb_client::{Client, Result};
///
/// fn main() -> Result<()> {
///     let client = Client::in_memory();
///     let mut batch = client.batch();
///
///     let put = batch.blob("users:alice").put(b"alice".to_vec(), None)?;
///     let get = batch.blob("users:bob").get()?;
///     batch.run()?;
///
///     put.get()?;
///     assert!(get.get().is_err()); // bob was never stored
///     assert_eq!(batch.success_count()?, 1);
///
///     batch.close();
///     Ok(())
/// }
/// ```
pub struct Batch {
    session: Arc<dyn Session>,
    operations: Vec<Operation>,
    state: Arc<RwLock<BatchState>>,
}

impl Batch {
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self {
            session,
            operations: Vec::new(),
            state: Arc::new(RwLock::new(BatchState::Building)),
        }
    }

    /// Queue operations on a blob entry.
    pub fn blob(&mut self, alias: impl Into<String>) -> BlobBatch<'_> {
        BlobBatch::new(self, alias.into())
    }

    /// Queue operations on an integer entry.
    pub fn integer(&mut self, alias: impl Into<String>) -> IntegerBatch<'_> {
        IntegerBatch::new(self, alias.into())
    }

    /// Queue an operation that takes a slot but does nothing.
    pub fn no_op(&mut self, alias: impl Into<String>) -> Result<Future<()>> {
        self.append(Operation::NoOp {
            alias: alias.into(),
        })
    }

    // Callers pick `T` to match the operation kind; the typed builders are
    // the only way in from outside the crate.
    pub(crate) fn append<T>(&mut self, operation: Operation) -> Result<Future<T>> {
        self.ensure_building()?;
        let index = self.operations.len();
        self.operations.push(operation);
        Ok(Future::new(Arc::clone(&self.state), index))
    }

    pub fn status(&self) -> BatchStatus {
        read_state(&self.state).status()
    }

    /// Number of queued operations.
    ///
    /// # Errors
    ///
    /// `Error::BatchClosed` once the batch is closed.
    pub fn operation_count(&self) -> Result<usize> {
        match self.status() {
            BatchStatus::Closed => Err(Error::BatchClosed),
            _ => Ok(self.operations.len()),
        }
    }

    /// The queued operations, in submission order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Submit every queued operation in one session call.
    ///
    /// Blocks for the duration of the round trip. When the session itself
    /// fails (for example the connection drops), the error is returned and
    /// the batch stays `Building`.
    ///
    /// # Errors
    ///
    /// * `Error::BatchAlreadyRun` if the batch already ran
    /// * `Error::BatchClosed` if the batch is closed
    /// * `Error::Remote` if the session could not complete the round trip
    pub fn run(&mut self) -> Result<()> {
        self.ensure_building()?;

        debug!("running batch of {} operations", self.operations.len());
        let submitted = self.session.submit_batch(&self.operations)?;
        let result = BatchResult::new(submitted);
        self.check_correlation(&result)?;

        debug!(
            "batch completed: {}/{} operations succeeded",
            result.success_count(),
            result.len()
        );
        *write_state(&self.state) = BatchState::Run(result);
        Ok(())
    }

    /// Number of operations that succeeded.
    ///
    /// # Errors
    ///
    /// * `Error::BatchNotRun` before `run()`
    /// * `Error::BatchClosed` once the batch is closed
    pub fn success_count(&self) -> Result<usize> {
        match &*read_state(&self.state) {
            BatchState::Building => Err(Error::BatchNotRun),
            BatchState::Run(result) => Ok(result.success_count()),
            BatchState::Closed => Err(Error::BatchClosed),
        }
    }

    /// True when every operation succeeded.
    pub fn success(&self) -> Result<bool> {
        let succeeded = self.success_count()?;
        Ok(succeeded == self.operation_count()?)
    }

    /// Close the batch and release its results.
    ///
    /// Idempotent. Every future of this batch reports `Error::BatchClosed`
    /// afterwards.
    pub fn close(&mut self) {
        let previous = std::mem::replace(&mut *write_state(&self.state), BatchState::Closed);
        if previous.status() != BatchStatus::Closed {
            debug!("closing batch in state {:?}", previous.status());
        }
        self.operations.clear();
        // dropping the previous state releases the result buffer, if any
        drop(previous);
    }

    fn ensure_building(&self) -> Result<()> {
        match self.status() {
            BatchStatus::Building => Ok(()),
            BatchStatus::Run => Err(Error::BatchAlreadyRun),
            BatchStatus::Closed => Err(Error::BatchClosed),
        }
    }

    // Results are matched to operations by index; a reply that does not line
    // up cannot be resolved safely.
    fn check_correlation(&self, result: &BatchResult) -> Result<()> {
        if result.len() != self.operations.len() {
            return Err(Error::unexpected_reply(format!(
                "session returned {} results for {} operations",
                result.len(),
                self.operations.len()
            )));
        }

        for (index, (op, res)) in self.operations.iter().zip(result.iter()).enumerate() {
            if op.kind() != res.kind || op.alias() != res.alias {
                return Err(Error::unexpected_reply(format!(
                    "result {} answers {} '{}' but operation is {} '{}'",
                    index,
                    res.kind,
                    res.alias,
                    op.kind(),
                    op.alias()
                )));
            }
        }
        Ok(())
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        if self.status() != BatchStatus::Closed {
            debug!("batch dropped without close(), closing it now");
            self.close();
        }
    }
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("status", &self.status())
            .field("operations", &self.operations.len())
            .finish()
    }
}
