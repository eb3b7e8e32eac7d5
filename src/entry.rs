//! Single-entry handles.
//!
//! Each call runs a one-operation batch and closes it before returning, so
//! no result buffer outlives the call.

use crate::batch::{Batch, FromResult, Future};
use crate::client::Client;
use crate::error::Result;
use std::time::SystemTime;

fn run_single<T, F>(client: &Client, build: F) -> Result<T>
where
    T: FromResult,
    F: FnOnce(&mut Batch) -> Result<Future<T>>,
{
    let mut batch = client.batch();
    let future = build(&mut batch)?;
    batch.run()?;
    let outcome = future.get();
    batch.close();
    outcome
}

/// Handle to a blob entry.
#[derive(Debug, Clone)]
pub struct Blob {
    client: Client,
    alias: String,
}

impl Blob {
    pub(crate) fn new(client: Client, alias: String) -> Self {
        Self { client, alias }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn get(&self) -> Result<Vec<u8>> {
        run_single(&self.client, |batch| batch.blob(self.alias.as_str()).get())
    }

    pub fn put(&self, content: impl Into<Vec<u8>>, expiry: Option<SystemTime>) -> Result<()> {
        run_single(&self.client, |batch| {
            batch.blob(self.alias.as_str()).put(content, expiry)
        })
    }

    pub fn update(&self, content: impl Into<Vec<u8>>, expiry: Option<SystemTime>) -> Result<()> {
        run_single(&self.client, |batch| {
            batch.blob(self.alias.as_str()).update(content, expiry)
        })
    }

    pub fn remove(&self) -> Result<()> {
        run_single(&self.client, |batch| batch.blob(self.alias.as_str()).remove())
    }

    /// Returns `None` if the swap happened, otherwise the current content.
    pub fn compare_and_swap(
        &self,
        content: impl Into<Vec<u8>>,
        comparand: impl Into<Vec<u8>>,
        expiry: Option<SystemTime>,
    ) -> Result<Option<Vec<u8>>> {
        run_single(&self.client, |batch| {
            batch
                .blob(self.alias.as_str())
                .compare_and_swap(content, comparand, expiry)
        })
    }

    pub fn get_and_update(
        &self,
        content: impl Into<Vec<u8>>,
        expiry: Option<SystemTime>,
    ) -> Result<Vec<u8>> {
        run_single(&self.client, |batch| {
            batch.blob(self.alias.as_str()).get_and_update(content, expiry)
        })
    }

    pub fn get_and_remove(&self) -> Result<Vec<u8>> {
        run_single(&self.client, |batch| {
            batch.blob(self.alias.as_str()).get_and_remove()
        })
    }

    /// Returns whether the blob was removed.
    pub fn remove_if(&self, comparand: impl Into<Vec<u8>>) -> Result<bool> {
        run_single(&self.client, |batch| {
            batch.blob(self.alias.as_str()).remove_if(comparand)
        })
    }
}

/// Handle to a 64-bit integer entry.
#[derive(Debug, Clone)]
pub struct Integer {
    client: Client,
    alias: String,
}

impl Integer {
    pub(crate) fn new(client: Client, alias: String) -> Self {
        Self { client, alias }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn get(&self) -> Result<i64> {
        run_single(&self.client, |batch| batch.integer(self.alias.as_str()).get())
    }

    pub fn put(&self, value: i64, expiry: Option<SystemTime>) -> Result<()> {
        run_single(&self.client, |batch| {
            batch.integer(self.alias.as_str()).put(value, expiry)
        })
    }

    pub fn update(&self, value: i64, expiry: Option<SystemTime>) -> Result<()> {
        run_single(&self.client, |batch| {
            batch.integer(self.alias.as_str()).update(value, expiry)
        })
    }

    pub fn remove(&self) -> Result<()> {
        run_single(&self.client, |batch| {
            batch.integer(self.alias.as_str()).remove()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_code::ErrorKind;
    use crate::session::MemorySession;
    use std::sync::Arc;

    #[test]
    fn single_calls_release_their_buffers() {
        let session = Arc::new(MemorySession::new());
        let client = Client::from_arc(session.clone());
        let blob = client.blob("doc");

        blob.put(b"v1".to_vec(), None).unwrap();
        assert_eq!(blob.get_and_update(b"v2".to_vec(), None).unwrap(), b"v1");
        assert!(blob.get_and_remove().is_ok());

        assert_eq!(session.allocated_buffers(), 3);
        assert_eq!(session.outstanding_buffers(), 0);
    }

    #[test]
    fn failure_still_releases_the_buffer() {
        let session = Arc::new(MemorySession::new());
        let client = Client::from_arc(session.clone());

        let err = client.blob("missing").get().unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::AliasNotFound));
        assert_eq!(session.outstanding_buffers(), 0);
    }

    #[test]
    fn blob_compare_and_swap_and_remove_if() {
        let client = Client::in_memory();
        let blob = client.blob("cas");
        blob.put(b"a".to_vec(), None).unwrap();

        assert_eq!(
            blob.compare_and_swap(b"b".to_vec(), b"x".to_vec(), None).unwrap(),
            Some(b"a".to_vec())
        );
        assert_eq!(blob.compare_and_swap(b"b".to_vec(), b"a".to_vec(), None).unwrap(), None);
        assert!(!blob.remove_if(b"a".to_vec()).unwrap());
        assert!(blob.remove_if(b"b".to_vec()).unwrap());
        assert!(blob.get().is_err());
    }

    #[test]
    fn integer_round_trip() {
        let client = Client::in_memory();
        let counter = client.integer("counter");
        counter.update(3, None).unwrap();
        counter.update(4, None).unwrap();
        assert_eq!(counter.get().unwrap(), 4);
        counter.remove().unwrap();
        assert_eq!(
            counter.get().unwrap_err().kind(),
            Some(ErrorKind::AliasNotFound)
        );
    }
}
