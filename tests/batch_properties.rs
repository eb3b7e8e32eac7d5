use qdb_client::{
    BatchStatus, Client, Error, ErrorKind, FromResult, Future, MemorySession, OperationKind,
};
use std::fmt::Debug;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

fn random_alias() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("test_{}", suffix)
}

fn tracked_client() -> (Arc<MemorySession>, Client) {
    let session = Arc::new(MemorySession::new());
    let client = Client::from_arc(session.clone());
    (session, client)
}

fn remote_kind(err: Error) -> ErrorKind {
    match err.kind() {
        Some(kind) => kind,
        None => panic!("expected a remote error, got {:?}", err),
    }
}

#[test]
fn operation_count_tracks_appends_until_closed() {
    let client = Client::in_memory();
    let n = rand::thread_rng().gen_range(1..32);

    let mut batch = client.batch();
    for _ in 0..n {
        batch.blob(random_alias()).put(b"x".to_vec(), None).unwrap();
    }
    assert_eq!(batch.operation_count().unwrap(), n);

    batch.run().unwrap();
    assert_eq!(batch.operation_count().unwrap(), n);

    batch.close();
    assert!(matches!(batch.operation_count(), Err(Error::BatchClosed)));
}

#[test]
fn second_run_is_rejected() {
    let client = Client::in_memory();
    let mut batch = client.batch();
    batch.no_op(random_alias()).unwrap();
    batch.run().unwrap();

    assert!(matches!(batch.run(), Err(Error::BatchAlreadyRun)));
    assert!(matches!(
        batch.blob(random_alias()).get(),
        Err(Error::BatchAlreadyRun)
    ));
}

#[test]
fn closed_batch_rejects_appends_and_run() {
    let client = Client::in_memory();
    let mut batch = client.batch();
    batch.close();

    assert!(matches!(
        batch.integer(random_alias()).put(1, None),
        Err(Error::BatchClosed)
    ));
    assert!(matches!(batch.run(), Err(Error::BatchClosed)));
}

#[test]
fn future_before_run_is_not_ready() {
    let client = Client::in_memory();
    let mut batch = client.batch();
    let future = batch.blob(random_alias()).get().unwrap();

    assert!(matches!(future.get(), Err(Error::BatchNotRun)));
    assert_eq!(batch.status(), BatchStatus::Building);
}

#[test]
fn put_then_put_again_reports_existing_alias() {
    let client = Client::in_memory();
    let alias = random_alias();

    let mut batch = client.batch();
    let put = batch.blob(alias.as_str()).put(b"X".to_vec(), None).unwrap();
    batch.run().unwrap();
    put.get().unwrap();
    batch.close();

    let err = client.blob(alias.as_str()).put(b"X".to_vec(), None).unwrap_err();
    assert_eq!(remote_kind(err), ErrorKind::AliasAlreadyExists);
}

#[test]
fn compare_and_swap_with_matching_comparand() {
    let client = Client::in_memory();
    let alias = random_alias();
    client.blob(alias.as_str()).put(b"V".to_vec(), None).unwrap();

    let mut batch = client.batch();
    let swap = batch
        .blob(alias.as_str())
        .compare_and_swap(b"new".to_vec(), b"V".to_vec(), None)
        .unwrap();
    batch.run().unwrap();

    assert_eq!(swap.get().unwrap(), None);
    assert_eq!(client.blob(alias.as_str()).get().unwrap(), b"new");
}

#[test]
fn compare_and_swap_with_other_comparand() {
    let client = Client::in_memory();
    let alias = random_alias();
    client.blob(alias.as_str()).put(b"V".to_vec(), None).unwrap();

    let mut batch = client.batch();
    let swap = batch
        .blob(alias.as_str())
        .compare_and_swap(b"new".to_vec(), b"W".to_vec(), None)
        .unwrap();
    batch.run().unwrap();

    assert_eq!(swap.get().unwrap(), Some(b"V".to_vec()));
    assert_eq!(client.blob(alias.as_str()).get().unwrap(), b"V");
}

#[test]
fn partial_failure_counts() {
    let client = Client::in_memory();

    let mut batch = client.batch();
    let put = batch.blob(random_alias()).put(b"X".to_vec(), None).unwrap();
    let get = batch.blob(random_alias()).get().unwrap();
    batch.run().unwrap();

    assert_eq!(batch.success_count().unwrap(), 1);
    assert!(!batch.success().unwrap());
    assert!(put.get().is_ok());
    assert_eq!(remote_kind(get.get().unwrap_err()), ErrorKind::AliasNotFound);
}

#[test]
fn double_close_releases_once() {
    let (session, client) = tracked_client();

    let mut batch = client.batch();
    batch.blob(random_alias()).put(b"X".to_vec(), None).unwrap();
    batch.run().unwrap();
    assert_eq!(session.outstanding_buffers(), 1);

    batch.close();
    batch.close();
    assert_eq!(session.released_buffers(), 1);
    assert_eq!(session.outstanding_buffers(), 0);
}

#[test]
fn dropped_batch_releases_its_buffer() {
    let (session, client) = tracked_client();
    {
        let mut batch = client.batch();
        batch.no_op(random_alias()).unwrap();
        batch.run().unwrap();
    }
    assert_eq!(session.outstanding_buffers(), 0);
}

#[test]
fn futures_fail_once_the_batch_is_closed() {
    let client = Client::in_memory();
    let mut batch = client.batch();
    let future = batch.no_op(random_alias()).unwrap();
    batch.run().unwrap();
    future.get().unwrap();

    batch.close();
    assert!(matches!(future.get(), Err(Error::BatchClosed)));
}

fn assert_reserved<T: FromResult + Debug>(future: &Future<T>, kind: &str) {
    let err = future.get().unwrap_err();
    assert_eq!(remote_kind(err), ErrorKind::ReservedAlias, "{}", kind);
}

#[test]
fn reserved_alias_is_refused_for_every_kind() {
    let client = Client::in_memory();
    let alias = format!("qdb{}", random_alias());
    let alias = alias.as_str();

    let mut batch = client.batch();
    let get = batch.blob(alias).get().unwrap();
    let put = batch.blob(alias).put(b"X".to_vec(), None).unwrap();
    let update = batch.blob(alias).update(b"X".to_vec(), None).unwrap();
    let remove = batch.blob(alias).remove().unwrap();
    let swap = batch
        .blob(alias)
        .compare_and_swap(b"X".to_vec(), b"Y".to_vec(), None)
        .unwrap();
    let get_and_update = batch.blob(alias).get_and_update(b"X".to_vec(), None).unwrap();
    let get_and_remove = batch.blob(alias).get_and_remove().unwrap();
    let remove_if = batch.blob(alias).remove_if(b"X".to_vec()).unwrap();
    let int_get = batch.integer(alias).get().unwrap();
    let int_put = batch.integer(alias).put(1, None).unwrap();
    let int_update = batch.integer(alias).update(1, None).unwrap();
    let int_remove = batch.integer(alias).remove().unwrap();
    let no_op = batch.no_op(alias).unwrap();
    batch.run().unwrap();

    assert_eq!(batch.success_count().unwrap(), 0);
    assert_reserved(&get, "get");
    assert_reserved(&put, "put");
    assert_reserved(&update, "update");
    assert_reserved(&remove, "remove");
    assert_reserved(&swap, "compare_and_swap");
    assert_reserved(&get_and_update, "get_and_update");
    assert_reserved(&get_and_remove, "get_and_remove");
    assert_reserved(&remove_if, "remove_if");
    assert_reserved(&int_get, "integer get");
    assert_reserved(&int_put, "integer put");
    assert_reserved(&int_update, "integer update");
    assert_reserved(&int_remove, "integer remove");
    assert_reserved(&no_op, "no_op");
}

#[test]
fn disabled_kinds_are_refused() {
    let session = MemorySession::new().with_disabled([OperationKind::GetAndRemove]);
    let client = Client::new(session);
    let alias = random_alias();
    client.blob(alias.as_str()).put(b"X".to_vec(), None).unwrap();

    let err = client.blob(alias.as_str()).get_and_remove().unwrap_err();
    assert_eq!(remote_kind(err), ErrorKind::OperationDisabled);
    assert_eq!(client.blob(alias.as_str()).get().unwrap(), b"X");
}

#[test]
fn expired_entries_read_as_absent() {
    let client = Client::in_memory();
    let alias = random_alias();
    let soon = SystemTime::now() + Duration::from_millis(50);
    client.blob(alias.as_str()).put(b"X".to_vec(), Some(soon)).unwrap();

    thread::sleep(Duration::from_millis(100));
    let err = client.blob(alias.as_str()).get().unwrap_err();
    assert_eq!(remote_kind(err), ErrorKind::AliasNotFound);

    // the slot is free again
    client.blob(alias.as_str()).put(b"Y".to_vec(), None).unwrap();
}

#[test]
fn expiry_in_the_past_is_out_of_bounds() {
    let client = Client::in_memory();
    let past = SystemTime::now() - Duration::from_secs(60);
    let err = client.integer(random_alias()).put(1, Some(past)).unwrap_err();
    assert_eq!(remote_kind(err), ErrorKind::OutOfBounds);
}

#[test]
fn blob_and_integer_do_not_mix() {
    let client = Client::in_memory();
    let alias = random_alias();
    client.integer(alias.as_str()).put(42, None).unwrap();

    let err = client.blob(alias.as_str()).get().unwrap_err();
    assert_eq!(remote_kind(err), ErrorKind::IncompatibleType);
    assert_eq!(client.integer(alias.as_str()).get().unwrap(), 42);
}

#[test]
fn futures_are_readable_from_many_threads() {
    let (session, client) = tracked_client();
    let aliases: Vec<String> = (0..8).map(|_| random_alias()).collect();
    for (i, alias) in aliases.iter().enumerate() {
        client.integer(alias.as_str()).put(i as i64, None).unwrap();
    }

    let mut batch = client.batch();
    let futures: Vec<_> = aliases
        .iter()
        .map(|alias| batch.integer(alias.as_str()).get().unwrap())
        .collect();
    batch.run().unwrap();

    let handles: Vec<_> = futures
        .into_iter()
        .enumerate()
        .map(|(i, future)| {
            thread::spawn(move || {
                for _ in 0..100 {
                    assert_eq!(future.get().unwrap(), i as i64);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    batch.close();
    assert_eq!(session.outstanding_buffers(), 0);
}
