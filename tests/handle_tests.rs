//! Read and read-write handle behaviour.

mod common;

use common::*;
use txscope::prelude::*;

#[test]
fn test_basic_round_trip() {
    let (env, _temp_dir) = create_test_env(1);

    let mut writer = ReadWriteHandle::open(&env, 0).unwrap();
    writer.write(b"alpha", b"one").unwrap();
    writer.commit().unwrap();

    let reader = ReadHandle::open(&env, 0).unwrap();
    let view = reader.read(b"alpha").unwrap().unwrap();
    assert_eq!(view, "one");
    assert_eq!(view.bytes(), b"one");
    drop(view);
    reader.commit().unwrap();
}

#[test]
fn test_concrete_scenario() {
    let (env, _temp_dir) = create_test_env(3);

    {
        let mut write_tx = ReadWriteHandle::open(&env, 0).unwrap();
        write_tx.write(b"key_1", b"mydataboy").unwrap();
        write_tx.commit().unwrap();
    }

    {
        let read_tx = ReadHandle::open(&env, 0).unwrap();
        let opt = read_tx.read(b"key_1").unwrap();
        assert!(matches!(opt, Some(ref data) if *data == "mydataboy"));
    }

    {
        let mut delete_tx = ReadWriteHandle::open(&env, 0).unwrap();
        delete_tx.delete(b"key_1").unwrap();
        delete_tx.commit().unwrap();
    }

    {
        let read_tx = ReadHandle::open(&env, 0).unwrap();
        assert!(read_tx.read(b"key_1").unwrap().is_none());
    }
}

#[test]
fn test_overwrite_replaces_value() {
    let (env, _temp_dir) = create_test_env(1);

    put(&env, 0, b"k", b"first");
    put(&env, 0, b"k", b"second, and longer");

    assert_eq!(get(&env, 0, b"k"), Some(b"second, and longer".to_vec()));
    assert_eq!(env.read(0, |h| h.len()).unwrap(), 1);
}

#[test]
fn test_empty_value_is_present() {
    let (env, _temp_dir) = create_test_env(1);

    put(&env, 0, b"empty", b"");

    env.read(0, |handle| {
        let view = handle.read(b"empty")?.expect("present");
        assert!(view.is_empty());
        assert!(handle.contains(b"empty")?);
        assert!(!handle.contains(b"other")?);
        Ok::<_, StoreError>(())
    })
    .unwrap();
}

#[test]
fn test_isolation_across_subdatabases() {
    let (env, _temp_dir) = create_test_env(3);

    put(&env, 0, b"shared-key", b"zero");

    assert_eq!(get(&env, 0, b"shared-key"), Some(b"zero".to_vec()));
    assert_eq!(get(&env, 1, b"shared-key"), None);
    assert_eq!(get(&env, 2, b"shared-key"), None);

    put(&env, 1, b"shared-key", b"one");
    assert_eq!(get(&env, 0, b"shared-key"), Some(b"zero".to_vec()));
    assert_eq!(get(&env, 1, b"shared-key"), Some(b"one".to_vec()));
}

#[test]
fn test_delete_missing_key() {
    let (env, _temp_dir) = create_test_env(2);

    let mut handle = ReadWriteHandle::open(&env, 1).unwrap();
    let err = handle.delete(b"ghost").unwrap_err();
    match &err {
        StoreError::KeyNotFound { subdatabase, key } => {
            assert_eq!(*subdatabase, 1);
            assert_eq!(key.as_slice(), b"ghost");
        }
        other => panic!("expected KeyNotFound, got {:?}", other),
    }
    assert!(err.is_recoverable());

    // the scope is still usable after a recoverable failure
    handle.write(b"real", b"value").unwrap();
    handle.commit().unwrap();
    assert_eq!(get(&env, 1, b"real"), Some(b"value".to_vec()));
}

#[test]
fn test_delete_then_rewrite_in_one_scope() {
    let (env, _temp_dir) = create_test_env(1);
    put(&env, 0, b"k", b"old");

    env.write(0, |handle| {
        handle.delete(b"k")?;
        assert!(handle.read(b"k")?.is_none());
        handle.write(b"k", b"new")
    })
    .unwrap();

    assert_eq!(get(&env, 0, b"k"), Some(b"new".to_vec()));
}

#[test]
fn test_writer_reads_its_own_writes() {
    let (env, _temp_dir) = create_test_env(1);

    let mut writer = ReadWriteHandle::open(&env, 0).unwrap();
    writer.write(b"pending", b"value").unwrap();
    assert_eq!(writer.read_owned(b"pending").unwrap(), Some(b"value".to_vec()));

    // not visible outside until commit
    assert_eq!(get(&env, 0, b"pending"), None);

    writer.commit().unwrap();
    assert_eq!(get(&env, 0, b"pending"), Some(b"value".to_vec()));
}

#[test]
fn test_dropped_writer_discards() {
    let (env, _temp_dir) = create_test_env(1);

    {
        let mut writer = ReadWriteHandle::open(&env, 0).unwrap();
        writer.write(b"never", b"committed").unwrap();
    }

    assert_eq!(get(&env, 0, b"never"), None);
    assert_eq!(env.open_transactions(), 0);
}

#[test]
fn test_explicit_abort_discards() {
    let (env, _temp_dir) = create_test_env(1);

    let mut writer = ReadWriteHandle::open(&env, 0).unwrap();
    writer.write(b"k", b"v").unwrap();
    writer.abort().unwrap();

    assert_eq!(get(&env, 0, b"k"), None);
}

fn lookup_text(access: &impl ReadAccess, key: &[u8]) -> Option<String> {
    access
        .read(key)
        .unwrap()
        .map(|view| view.as_str().unwrap().to_string())
}

fn count_entries(access: &dyn ReadAccess) -> u64 {
    access.len().unwrap()
}

#[test]
fn test_read_write_handle_through_read_surface() {
    let (env, _temp_dir) = create_test_env(1);
    put(&env, 0, b"poly", b"morphic");

    let reader = ReadHandle::open(&env, 0).unwrap();
    let from_reader = lookup_text(&reader, b"poly");
    let reader_count = count_entries(&reader);
    reader.commit().unwrap();

    let writer = ReadWriteHandle::open(&env, 0).unwrap();
    let from_writer = lookup_text(&writer, b"poly");
    let writer_count = count_entries(&writer);
    writer.commit().unwrap();

    assert_eq!(from_reader.as_deref(), Some("morphic"));
    assert_eq!(from_reader, from_writer);
    assert_eq!(reader_count, writer_count);
    assert_eq!(lookup_text(&ReadHandle::open(&env, 0).unwrap(), b"absent"), None);
}

#[test]
fn test_write_many_and_len() {
    let (env, _temp_dir) = create_test_env(2);

    let entries: Vec<(String, String)> = (0..500)
        .map(|i| (format!("key_{:04}", i), format!("value_{}", i)))
        .collect();

    let written = env
        .write(1, |handle| handle.write_many(entries.iter().map(|(k, v)| (k, v))))
        .unwrap();
    assert_eq!(written, 500);

    env.read(1, |handle| {
        assert_eq!(handle.len()?, 500);
        assert!(!handle.is_empty()?);
        let view = handle.read(b"key_0042")?.unwrap();
        assert_eq!(view, "value_42");
        Ok::<_, StoreError>(())
    })
    .unwrap();
    assert!(env.read(0, |handle| handle.is_empty()).unwrap());
}

fn bulk_write(count: u64) {
    let (env, _temp_dir) = create_test_env(1);

    let mut writer = ReadWriteHandle::open(&env, 0).unwrap();
    for i in 0..count {
        let key = i.to_string();
        writer.write(key.as_bytes(), key.as_bytes()).unwrap();
    }

    // nothing is visible before the commit
    let before = ReadHandle::open(&env, 0).unwrap();
    assert_eq!(before.len().unwrap(), 0);
    assert!(before.read(b"0").unwrap().is_none());
    before.commit().unwrap();

    writer.commit().unwrap();

    let after = ReadHandle::open(&env, 0).unwrap();
    assert_eq!(after.len().unwrap(), count);
    for i in (0..count).step_by(997) {
        let key = i.to_string();
        let view = after.read(key.as_bytes()).unwrap().unwrap();
        assert_eq!(view, key.as_str());
    }
    let last = (count - 1).to_string();
    assert!(after.contains(last.as_bytes()).unwrap());
}

#[test]
fn test_bulk_sequential_keys() {
    bulk_write(100_000);
}

/// Run with `cargo test --release --test handle_tests -- --ignored`.
#[test]
#[ignore = "slow in debug builds"]
fn test_bulk_one_million_keys() {
    bulk_write(1_000_000);
}
