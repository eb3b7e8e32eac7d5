//! # Wire Protocol
//!
//! Batches travel over TCP as JSON, one message per line:
//!
//! - the client sends a [`BatchRequest`] holding every operation of a batch
//! - the server answers with exactly one [`BatchResponse`]
//!
//! ## Example
//! ```text
//! > {"version":1,"operations":[{"op":"put","alias":"a","value":{"blob":"eA=="},"expiry":null}]}
//! < {"status":"completed","success_count":1,"results":[{"alias":"a","kind":"put","code":0}]}
//! ```
//!
//! A line longer than the receiver's limit (see [`MAX_MESSAGE_BYTES`]) is
//! refused with `INVALID_PROTOCOL` and the connection is dropped, since
//! the stream can no longer be split into messages.
//!
//! A request the server cannot read is answered with a `rejected` response
//! carrying an `INVALID_PROTOCOL` or `INVALID_VERSION` code. Result codes are
//! raw; the client classifies them.

use crate::batch::OperationResult;
use crate::error_code::ErrorCode;
use crate::operation::Operation;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Bumped whenever the message shapes change incompatibly.
pub const PROTOCOL_VERSION: u16 = 1;

/// Longest message line either side accepts, newline excluded.
pub const MAX_MESSAGE_BYTES: usize = 256 * 1024 * 1024;

/// One batch, as sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub version: u16,
    pub operations: Vec<Operation>,
}

impl BatchRequest {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            operations,
        }
    }
}

/// The server's answer to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchResponse {
    /// The batch was executed; one result per operation
    Completed {
        success_count: usize,
        results: Vec<OperationResult>,
    },
    /// The request was not executed at all
    Rejected { code: ErrorCode, message: String },
}

impl BatchResponse {
    pub fn rejected(code: ErrorCode, message: impl Into<String>) -> Self {
        BatchResponse::Rejected {
            code,
            message: message.into(),
        }
    }
}

/// Serialize a message as one newline-terminated line.
pub fn encode_line<T: Serialize>(message: &T) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Parse one line, ignoring surrounding whitespace and the line terminator.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> serde_json::Result<T> {
    serde_json::from_str(line.trim())
}

/// Parse a request line as the server sees it. Anything that is not a
/// current-version request is turned into the rejection to send back.
pub fn parse_request(line: &str) -> Result<BatchRequest, BatchResponse> {
    let request: BatchRequest = decode_line(line).map_err(|e| {
        BatchResponse::rejected(ErrorCode::INVALID_PROTOCOL, format!("malformed request: {}", e))
    })?;

    if request.version != PROTOCOL_VERSION {
        return Err(BatchResponse::rejected(
            ErrorCode::INVALID_VERSION,
            format!(
                "protocol version {} is not supported (expected {})",
                request.version, PROTOCOL_VERSION
            ),
        ));
    }
    Ok(request)
}
