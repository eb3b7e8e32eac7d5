//! Per-operation results of one batch run.

use crate::error_code::{classify, ErrorCode, RemoteError};
use crate::operation::{OperationKind, Value};
use crate::session::SubmittedBatch;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one operation, at the same index as the operation it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub alias: String,
    pub kind: OperationKind,
    pub code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl OperationResult {
    pub fn new(alias: impl Into<String>, kind: OperationKind, code: ErrorCode) -> Self {
        Self {
            alias: alias.into(),
            kind,
            code,
            value: None,
            message: String::new(),
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Classify the code; on success hand back the payload, if any.
    pub fn outcome(&self) -> Result<Option<&Value>, RemoteError> {
        classify(self.code, &self.message)?;
        Ok(self.value.as_ref())
    }
}

/// Memory a session handed out for a batch's results.
///
/// `release` consumes the box, so a buffer can be given back at most once.
pub trait NativeBuffer: Send + Sync {
    fn release(self: Box<Self>);
}

/// The results of one `run()`, together with the buffer backing them.
///
/// The buffer is released when the `BatchResult` is dropped. A batch drops
/// its result exactly once: on `close()`, or when the batch itself is dropped.
pub struct BatchResult {
    success_count: usize,
    results: Vec<OperationResult>,
    buffer: Option<Box<dyn NativeBuffer>>,
}

impl BatchResult {
    pub(crate) fn new(submitted: SubmittedBatch) -> Self {
        let SubmittedBatch {
            success_count,
            results,
            buffer,
        } = submitted;

        let counted = results.iter().filter(|r| r.is_success()).count();
        if counted != success_count {
            warn!(
                "session reported {} successes but {} results classify as success",
                success_count, counted
            );
        }

        Self {
            success_count,
            results,
            buffer,
        }
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&OperationResult> {
        self.results.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationResult> {
        self.results.iter()
    }

    fn release(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            debug!("releasing result buffer for {} operations", self.results.len());
            buffer.release();
        }
    }
}

impl Drop for BatchResult {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for BatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchResult")
            .field("success_count", &self.success_count)
            .field("results", &self.results)
            .field("buffered", &self.buffer.is_some())
            .finish()
    }
}
