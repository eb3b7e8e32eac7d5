//! Deferred per-operation results.

use super::result::OperationResult;
use super::{read_state, BatchState};
use crate::error::{Error, Result};
use crate::error_code::{classify, ErrorCode};
use crate::operation::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

/// Conversion from a successful [`OperationResult`] into the typed value a
/// [`Future`] hands out. Only called once the code classified as success.
pub trait FromResult: Sized {
    fn from_result(result: &OperationResult) -> Result<Self>;
}

/// Put, Update, Remove and NoOp succeed without a value.
impl FromResult for () {
    fn from_result(_result: &OperationResult) -> Result<Self> {
        Ok(())
    }
}

/// Blob content returned by Get, GetAndUpdate and GetAndRemove.
impl FromResult for Vec<u8> {
    fn from_result(result: &OperationResult) -> Result<Self> {
        match &result.value {
            Some(Value::Blob(content)) => Ok(content.clone()),
            other => Err(mismatch(result, "blob", other.as_ref())),
        }
    }
}

/// CompareAndSwap: `None` when the comparand matched and the swap happened,
/// otherwise the content currently stored.
impl FromResult for Option<Vec<u8>> {
    fn from_result(result: &OperationResult) -> Result<Self> {
        match &result.value {
            None => Ok(None),
            Some(Value::Blob(content)) => Ok(Some(content.clone())),
            other => Err(mismatch(result, "blob", other.as_ref())),
        }
    }
}

/// RemoveIf: whether the entry was removed.
impl FromResult for bool {
    fn from_result(result: &OperationResult) -> Result<Self> {
        Ok(result.code != ErrorCode::UNMATCHED_CONTENT)
    }
}

/// Integer Get.
impl FromResult for i64 {
    fn from_result(result: &OperationResult) -> Result<Self> {
        match &result.value {
            Some(Value::Integer(n)) => Ok(*n),
            other => Err(mismatch(result, "integer", other.as_ref())),
        }
    }
}

fn mismatch(result: &OperationResult, expected: &str, got: Option<&Value>) -> Error {
    let got = match got {
        None => "no value",
        Some(Value::Blob(_)) => "a blob",
        Some(Value::Integer(_)) => "an integer",
    };
    Error::unexpected_reply(format!(
        "{} on '{}' expected {} but the reply carried {}",
        result.kind, result.alias, expected, got
    ))
}

/// Handle to the result of one queued operation.
///
/// Created when the operation is appended and bound to its index. It
/// resolves only while the owning batch is in the `Run` state.
pub struct Future<T> {
    state: Arc<RwLock<BatchState>>,
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Future<T> {
    pub(crate) fn new(state: Arc<RwLock<BatchState>>, index: usize) -> Self {
        Self {
            state,
            index,
            _marker: PhantomData,
        }
    }

    /// Position of the bound operation in its batch.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T: FromResult> Future<T> {
    /// Resolve the operation.
    ///
    /// # Errors
    ///
    /// * `Error::BatchNotRun` before the batch ran
    /// * `Error::BatchClosed` once the batch is closed
    /// * `Error::Remote` when this operation failed; other operations in the
    ///   batch are unaffected
    pub fn get(&self) -> Result<T> {
        let state = read_state(&self.state);
        match &*state {
            BatchState::Building => Err(Error::BatchNotRun),
            BatchState::Closed => Err(Error::BatchClosed),
            BatchState::Run(result) => {
                let op = result.get(self.index).ok_or_else(|| {
                    Error::unexpected_reply(format!("no result at index {}", self.index))
                })?;
                classify(op.code, &op.message)?;
                T::from_result(op)
            }
        }
    }
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.state), self.index)
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future").field("index", &self.index).finish()
    }
}
