//! # qdb-client
//!
//! Client-side batching for a remote key-value store. Operations on many
//! entries are queued in a [`Batch`], sent in one round trip, and read back
//! through typed [`Future`]s once the batch has run.
//!
//! ```rust
//! use qdb_client::{Client, Result};
//!
//! fn main() -> Result<()> {
//!     let client = Client::in_memory();
//!
//!     let mut batch = client.batch();
//!     let created = batch.blob("doc").put(b"v1".to_vec(), None)?;
//!     let counter = batch.integer("views").update(1, None)?;
//!     batch.run()?;
//!
//!     created.get()?;
//!     counter.get()?;
//!     assert!(batch.success()?);
//!     batch.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`batch`]: batches, futures and the owned result set
//! - [`error_code`]: the 32-bit status codes and their classification
//! - [`session`]: how a batch reaches the store
//! - [`store`] and [`server`]: the reference store and its TCP server

pub mod batch;
pub mod client;
pub mod config;
pub mod entry;
pub mod error;
pub mod error_code;
pub mod operation;
pub mod protocol;
pub mod server;
pub mod session;
pub mod store;

pub use batch::{
    Batch, BatchResult, BatchStatus, BlobBatch, FromResult, Future, IntegerBatch, NativeBuffer,
    OperationResult,
};
pub use client::Client;
pub use config::{ServerConfig, SessionConfig};
pub use entry::{Blob, Integer};
pub use error::{Error, Result};
pub use error_code::{classify, ErrorCode, ErrorKind, Origin, RemoteError, Severity};
pub use operation::{EntryType, Operation, OperationKind, Value};
pub use session::{MemorySession, Session, SubmittedBatch, TcpSession};
