//! Cursor-bound read views.
//!
//! A [`ReadView`] hands out the stored bytes of one value straight from the
//! engine's pages, without copying. It keeps the engine table handle that
//! produced those bytes (the "cursor") alive next to the `AccessGuard`
//! borrowing from it; dropping the view releases both.
//!
//! # Lifetimes
//!
//! The view borrows the transaction it was read from, so it cannot be used
//! after that transaction is committed or aborted, and the transaction cannot
//! be finished while a view is still alive:
//!
//! ```compile_fail
//! # use txscope::prelude::*;
//! # fn example(env: &Environment) -> Result<(), StoreError> {
//! let handle = ReadHandle::open(env, 0)?;
//! let view = handle.read(b"key")?;
//! handle.commit()?; // error: `handle` is still borrowed by `view`
//! drop(view);
//! # Ok(())
//! # }
//! ```
//!
//! Within a write transaction the engine allows one open handle per table, so
//! only one view per sub-database can be live at a time there; a second
//! lookup while the first view is held fails with [`StoreError::Cursor`].

use std::fmt;
use std::ops::Deref;

use ouroboros::self_referencing;
use redb::{AccessGuard, ReadOnlyTable, ReadableTable, ReadableTableMetadata, StorageError, Table};

use crate::environment::{RawBytes, SubDatabase};
use crate::errors::{StoreError, StoreResult};
use crate::transaction::{EngineRef, Transaction};

#[self_referencing]
struct SnapshotCursor {
    table: ReadOnlyTable<RawBytes, RawBytes>,
    #[borrows(table)]
    #[covariant]
    guard: AccessGuard<'this, RawBytes>,
}

#[self_referencing]
struct PendingCursor<'txn> {
    table: Table<'txn, RawBytes, RawBytes>,
    #[borrows(table)]
    #[covariant]
    guard: AccessGuard<'this, RawBytes>,
}

enum Cursor<'txn> {
    Snapshot(SnapshotCursor),
    Pending(PendingCursor<'txn>),
}

enum Miss {
    Absent,
    Engine(StorageError),
}

fn position<G>(found: Result<Option<G>, StorageError>) -> Result<G, Miss> {
    match found {
        Ok(Some(guard)) => Ok(guard),
        Ok(None) => Err(Miss::Absent),
        Err(err) => Err(Miss::Engine(err)),
    }
}

/// Zero-copy view of one stored value.
pub struct ReadView<'txn> {
    cursor: Cursor<'txn>,
    subdatabase: usize,
}

impl<'txn> ReadView<'txn> {
    pub fn bytes(&self) -> &[u8] {
        match &self.cursor {
            Cursor::Snapshot(cursor) => cursor.borrow_guard().value(),
            Cursor::Pending(cursor) => cursor.borrow_guard().value(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes().to_vec()
    }

    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.bytes())
    }

    /// Index of the sub-database the value was read from.
    pub fn subdatabase(&self) -> usize {
        self.subdatabase
    }
}

impl Deref for ReadView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes()
    }
}

impl AsRef<[u8]> for ReadView<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes()
    }
}

impl PartialEq<[u8]> for ReadView<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.bytes() == other
    }
}

impl PartialEq<&[u8]> for ReadView<'_> {
    fn eq(&self, other: &&[u8]) -> bool {
        self.bytes() == *other
    }
}

impl PartialEq<str> for ReadView<'_> {
    fn eq(&self, other: &str) -> bool {
        self.bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for ReadView<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.bytes() == other.as_bytes()
    }
}

impl fmt::Debug for ReadView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Ok(text) => f.debug_tuple("ReadView").field(&text).finish(),
            Err(_) => f.debug_tuple("ReadView").field(&self.bytes()).finish(),
        }
    }
}

/// Position a cursor on `key` in `subdatabase`.
///
/// Returns `Ok(None)` when the key is absent.
pub(crate) fn lookup<'txn>(
    txn: &'txn Transaction<'_>,
    subdatabase: &SubDatabase,
    key: &[u8],
) -> StoreResult<Option<ReadView<'txn>>> {
    let index = subdatabase.index();
    let cursor = match txn.engine()? {
        EngineRef::Read(read) => {
            let table = read
                .open_table(subdatabase.definition())
                .map_err(|err| StoreError::cursor(index, err))?;
            SnapshotCursor::try_new(table, |table| position(table.get(key))).map(Cursor::Snapshot)
        }
        EngineRef::Write(write) => {
            let table = write
                .open_table(subdatabase.definition())
                .map_err(|err| StoreError::cursor(index, err))?;
            PendingCursor::try_new(table, |table| position(table.get(key))).map(Cursor::Pending)
        }
    };

    match cursor {
        Ok(cursor) => Ok(Some(ReadView {
            cursor,
            subdatabase: index,
        })),
        Err(Miss::Absent) => Ok(None),
        Err(Miss::Engine(err)) => Err(StoreError::cursor(index, err)),
    }
}

/// Number of entries stored in `subdatabase` as seen by `txn`.
pub(crate) fn count(txn: &Transaction<'_>, subdatabase: &SubDatabase) -> StoreResult<u64> {
    let index = subdatabase.index();
    let entries = match txn.engine()? {
        EngineRef::Read(read) => read
            .open_table(subdatabase.definition())
            .map_err(|err| StoreError::cursor(index, err))?
            .len(),
        EngineRef::Write(write) => write
            .open_table(subdatabase.definition())
            .map_err(|err| StoreError::cursor(index, err))?
            .len(),
    };
    entries.map_err(|err| StoreError::cursor(index, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::transaction::TxnMode;

    #[test]
    fn test_view_from_pending_write() {
        let temp_dir = tempfile::tempdir().unwrap();
        let env = Environment::open_at(temp_dir.path(), 1).unwrap();
        let subdatabase = env.subdatabase(0).unwrap().clone();

        let txn = Transaction::begin_write(&env).unwrap();
        {
            let write = txn.write_engine().unwrap();
            let mut table = write.open_table(subdatabase.definition()).unwrap();
            table.insert(&b"k"[..], &b"pending"[..]).unwrap();
        }

        let view = lookup(&txn, &subdatabase, b"k").unwrap().unwrap();
        assert_eq!(view, "pending");
        assert_eq!(view.len(), 7);
        assert_eq!(view.subdatabase(), 0);

        // one open table per write transaction
        assert!(matches!(
            lookup(&txn, &subdatabase, b"k"),
            Err(StoreError::Cursor { subdatabase: 0, .. })
        ));
        drop(view);

        assert!(lookup(&txn, &subdatabase, b"missing").unwrap().is_none());
        assert_eq!(count(&txn, &subdatabase).unwrap(), 1);
        txn.commit().unwrap();
    }

    #[test]
    fn test_snapshot_views_can_overlap() {
        let temp_dir = tempfile::tempdir().unwrap();
        let env = Environment::open_at(temp_dir.path(), 1).unwrap();
        let subdatabase = env.subdatabase(0).unwrap().clone();

        let txn = Transaction::begin_write(&env).unwrap();
        {
            let write = txn.write_engine().unwrap();
            let mut table = write.open_table(subdatabase.definition()).unwrap();
            table.insert(&b"a"[..], &b"1"[..]).unwrap();
            table.insert(&b"b"[..], &[0xffu8, 0xfe][..]).unwrap();
        }
        txn.commit().unwrap();

        let reader = Transaction::begin(&env, TxnMode::ReadOnly).unwrap();
        let a = lookup(&reader, &subdatabase, b"a").unwrap().unwrap();
        let b = lookup(&reader, &subdatabase, b"b").unwrap().unwrap();
        assert_eq!(a.as_str().unwrap(), "1");
        assert!(b.as_str().is_err());
        assert_eq!(&*b, &[0xffu8, 0xfe][..]);
        assert_eq!(format!("{:?}", a), "ReadView(\"1\")");
        drop((a, b));
        reader.commit().unwrap();
    }
}
