//! # Client
//!
//! Entry point for applications. A [`Client`] wraps one session and hands
//! out batches and single-entry handles that all share it.

use crate::batch::Batch;
use crate::config::SessionConfig;
use crate::entry::{Blob, Integer};
use crate::error::Result;
use crate::session::{MemorySession, Session, TcpSession};
use std::fmt;
use std::sync::Arc;

/// Cheap to clone; clones share the session.
///
/// # Example
///
/// ```rust
/// use qdb_client::Client;
///
/// let client = Client::in_memory();
/// client.blob("greeting").put(b"hello".to_vec(), None).unwrap();
/// assert_eq!(client.blob("greeting").get().unwrap(), b"hello");
/// ```
#[derive(Clone)]
pub struct Client {
    session: Arc<dyn Session>,
}

impl Client {
    pub fn new(session: impl Session + 'static) -> Self {
        Self {
            session: Arc::new(session),
        }
    }

    pub fn from_arc(session: Arc<dyn Session>) -> Self {
        Self { session }
    }

    /// Connect to a server at `addr` ("host:port").
    pub fn connect(addr: &str) -> Result<Self> {
        Ok(Self::new(TcpSession::connect(addr)?))
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        Ok(Self::new(TcpSession::from_config(config)?))
    }

    /// A client over a fresh in-process store.
    pub fn in_memory() -> Self {
        Self::new(MemorySession::new())
    }

    /// Start an empty batch.
    pub fn batch(&self) -> Batch {
        Batch::new(Arc::clone(&self.session))
    }

    pub fn blob(&self, alias: impl Into<String>) -> Blob {
        Blob::new(self.clone(), alias.into())
    }

    pub fn integer(&self, alias: impl Into<String>) -> Integer {
        Integer::new(self.clone(), alias.into())
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}
