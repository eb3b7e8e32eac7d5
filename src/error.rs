//! Error types for batch and entry operations

use crate::error_code::{classify, ErrorCode, ErrorKind, Origin, RemoteError};
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the client.
///
/// The three `Batch*` variants are usage errors: they come from the local
/// batch state machine, are raised synchronously and never wrap a remote
/// cause. Everything the store reports arrives as [`Error::Remote`].
#[derive(Error, Debug)]
pub enum Error {
    /// Results were requested before the batch was run
    #[error("batch has not been run yet")]
    BatchNotRun,

    /// The batch was already run and can no longer be modified or re-run
    #[error("batch has already been run")]
    BatchAlreadyRun,

    /// The batch was closed and its results released
    #[error("batch is closed")]
    BatchClosed,

    /// A classified failure reported for one operation
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// I/O errors outside of a session round trip
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Configuration could not be loaded
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Classify `code` and wrap the failure. Returns `None` for success codes.
    pub fn from_code(code: ErrorCode, message: &str) -> Option<Self> {
        classify(code, message).err().map(Error::Remote)
    }

    /// Build a remote error for a code that is known to be a failure.
    ///
    /// A success code handed in here is reported as an unexpected reply.
    pub fn remote(code: ErrorCode, message: impl AsRef<str>) -> Self {
        match classify(code, message.as_ref()) {
            Err(remote) => Error::Remote(remote),
            Ok(()) => Self::unexpected_reply(message),
        }
    }

    /// A reply that could not be interpreted.
    pub fn unexpected_reply(message: impl AsRef<str>) -> Self {
        let message = match message.as_ref() {
            "" => ErrorCode::UNEXPECTED_REPLY.description().to_string(),
            other => other.to_string(),
        };
        Error::Remote(RemoteError {
            origin: Origin::Protocol,
            kind: ErrorKind::UnexpectedReply,
            code: ErrorCode::UNEXPECTED_REPLY,
            message,
        })
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config { message: msg.into() }
    }

    /// The classified kind, for remote errors.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Remote(remote) => Some(remote.kind),
            _ => None,
        }
    }

    /// True for the local state-machine errors.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::BatchNotRun | Error::BatchAlreadyRun | Error::BatchClosed
        )
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config {
            message: err.to_string(),
        }
    }
}
