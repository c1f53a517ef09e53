//! Read and read-write handles.
//!
//! A handle owns one [`Transaction`] and is bound to one sub-database. The
//! read-only capability set lives in the [`ReadAccess`] trait, implemented by
//! both handle types, so code written against `ReadAccess` runs unchanged on a
//! [`ReadWriteHandle`].
//!
//! ```rust,no_run
//! use txscope::prelude::*;
//!
//! fn greeting(access: &impl ReadAccess) -> StoreResult<Option<String>> {
//!     Ok(access
//!         .read(b"greeting")?
//!         .map(|view| String::from_utf8_lossy(view.bytes()).into_owned()))
//! }
//!
//! # fn main() -> StoreResult<()> {
//! # let env = Environment::open_at("./data", 1)?;
//! let mut writer = ReadWriteHandle::open(&env, 0)?;
//! writer.write(b"greeting", b"hello")?;
//! assert_eq!(greeting(&writer)?.as_deref(), Some("hello"));
//! writer.commit()?;
//!
//! let reader = ReadHandle::open(&env, 0)?;
//! assert_eq!(greeting(&reader)?.as_deref(), Some("hello"));
//! # Ok(())
//! # }
//! ```

use crate::environment::{Environment, SubDatabase};
use crate::errors::{StoreError, StoreResult};
use crate::guards::{self, ReadView};
use crate::transaction::{Transaction, TxnMode};

/// Read-only operations shared by every handle.
pub trait ReadAccess {
    fn transaction(&self) -> &Transaction<'_>;

    fn subdatabase(&self) -> &SubDatabase;

    /// Look up `key`, returning a zero-copy view of its value.
    fn read(&self, key: &[u8]) -> StoreResult<Option<ReadView<'_>>> {
        guards::lookup(self.transaction(), self.subdatabase(), key)
    }

    fn contains(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.read(key)?.is_some())
    }

    /// Look up `key` and copy its value out.
    fn read_owned(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.read(key)?.map(|view| view.to_vec()))
    }

    fn len(&self) -> StoreResult<u64> {
        guards::count(self.transaction(), self.subdatabase())
    }

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Read-only scope on one sub-database.
#[derive(Debug)]
pub struct ReadHandle<'p> {
    txn: Transaction<'p>,
    subdatabase: SubDatabase,
}

impl ReadHandle<'static> {
    pub fn open(env: &Environment, index: usize) -> StoreResult<Self> {
        let subdatabase = env.subdatabase(index)?.clone();
        let txn = Transaction::begin(env, TxnMode::ReadOnly)?;
        Ok(Self { txn, subdatabase })
    }
}

impl<'p> ReadHandle<'p> {
    /// Open a read handle nested inside `parent`.
    pub fn nested(parent: &'p Transaction<'_>, index: usize) -> StoreResult<Self> {
        let subdatabase = parent.environment().subdatabase(index)?.clone();
        let txn = parent.nested(TxnMode::ReadOnly)?;
        Ok(Self { txn, subdatabase })
    }

    pub fn commit(self) -> StoreResult<()> {
        self.txn.commit()
    }

    pub fn abort(self) -> StoreResult<()> {
        self.txn.abort()
    }

    pub fn finish<T, E>(self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        self.txn.finish(outcome)
    }
}

impl ReadAccess for ReadHandle<'_> {
    fn transaction(&self) -> &Transaction<'_> {
        &self.txn
    }

    fn subdatabase(&self) -> &SubDatabase {
        &self.subdatabase
    }
}

/// Read-write scope on one sub-database.
#[derive(Debug)]
pub struct ReadWriteHandle<'p> {
    txn: Transaction<'p>,
    subdatabase: SubDatabase,
}

impl ReadWriteHandle<'static> {
    pub fn open(env: &Environment, index: usize) -> StoreResult<Self> {
        let subdatabase = env.subdatabase(index)?.clone();
        let txn = Transaction::begin(env, TxnMode::ReadWrite)?;
        Ok(Self { txn, subdatabase })
    }
}

impl<'p> ReadWriteHandle<'p> {
    /// Open a read-write handle nested inside `parent`.
    pub fn nested(parent: &'p Transaction<'_>, index: usize) -> StoreResult<Self> {
        let subdatabase = parent.environment().subdatabase(index)?.clone();
        let txn = parent.nested(TxnMode::ReadWrite)?;
        Ok(Self { txn, subdatabase })
    }

    /// Insert or replace the value stored under `key`.
    pub fn write(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let index = self.subdatabase.index();
        let engine = self.txn.write_engine()?;
        let mut table = engine
            .open_table(self.subdatabase.definition())
            .map_err(|err| StoreError::write(index, err))?;
        table
            .insert(key, value)
            .map_err(|err| StoreError::write(index, err))?;
        Ok(())
    }

    /// Upsert every entry through a single table handle.
    ///
    /// Returns the number of entries written.
    pub fn write_many<I, K, V>(&mut self, entries: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let index = self.subdatabase.index();
        let engine = self.txn.write_engine()?;
        let mut table = engine
            .open_table(self.subdatabase.definition())
            .map_err(|err| StoreError::write(index, err))?;
        let mut written = 0;
        for (key, value) in entries {
            table
                .insert(key.as_ref(), value.as_ref())
                .map_err(|err| StoreError::write(index, err))?;
            written += 1;
        }
        Ok(written)
    }

    /// Remove `key`, failing with [`StoreError::KeyNotFound`] if it is absent.
    pub fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        let index = self.subdatabase.index();
        let engine = self.txn.write_engine()?;
        let mut table = engine
            .open_table(self.subdatabase.definition())
            .map_err(|err| StoreError::delete(index, err))?;
        let removed = table
            .remove(key)
            .map_err(|err| StoreError::delete(index, err))?
            .is_some();
        if !removed {
            return Err(StoreError::KeyNotFound {
                subdatabase: index,
                key: key.to_vec(),
            });
        }
        Ok(())
    }

    pub fn commit(self) -> StoreResult<()> {
        self.txn.commit()
    }

    pub fn abort(self) -> StoreResult<()> {
        self.txn.abort()
    }

    pub fn finish<T, E>(self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        self.txn.finish(outcome)
    }
}

impl ReadAccess for ReadWriteHandle<'_> {
    fn transaction(&self) -> &Transaction<'_> {
        &self.txn
    }

    fn subdatabase(&self) -> &SubDatabase {
        &self.subdatabase
    }
}
