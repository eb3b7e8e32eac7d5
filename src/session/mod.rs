//! # Sessions
//!
//! A [`Session`] carries one batch to the store and brings back the raw
//! per-operation outcomes. Sessions never classify codes; that is left to
//! the futures that read them.
//!
//! - [`MemorySession`]: runs batches against an in-process store
//! - [`TcpSession`]: sends batches to a server over TCP

pub mod memory;
pub mod tcp;

pub use memory::MemorySession;
pub use tcp::TcpSession;

use crate::batch::{NativeBuffer, OperationResult};
use crate::error::Result;
use crate::operation::Operation;
use std::fmt;

/// What a session returns for one batch.
pub struct SubmittedBatch {
    /// Number of operations that succeeded, as reported by the store
    pub success_count: usize,
    /// One result per submitted operation, in submission order
    pub results: Vec<OperationResult>,
    /// Memory backing `results`, if the session allocated any
    pub buffer: Option<Box<dyn NativeBuffer>>,
}

impl fmt::Debug for SubmittedBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmittedBatch")
            .field("success_count", &self.success_count)
            .field("results", &self.results)
            .field("buffered", &self.buffer.is_some())
            .finish()
    }
}

/// The capability a batch runs through.
#[cfg_attr(test, mockall::automock)]
pub trait Session: Send + Sync {
    /// Submit `operations` in a single round trip.
    ///
    /// An `Err` means the round trip itself failed; per-operation failures
    /// are reported inside the returned results.
    fn submit_batch(&self, operations: &[Operation]) -> Result<SubmittedBatch>;
}
