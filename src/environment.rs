//! The storage environment and its sub-databases.
//!
//! An [`Environment`] owns one engine database stored as `data.redb` inside
//! its location directory, plus a fixed set of sub-databases opened when the
//! environment opens. Sub-databases are addressed by index and never change
//! identity afterwards.
//!
//! ```rust,no_run
//! use txscope::prelude::*;
//!
//! # fn main() -> Result<(), StoreError> {
//! let env = Environment::open_at("./data/accounts", 3)?;
//!
//! env.write(0, |handle| handle.write(b"key_1", b"mydataboy"))?;
//!
//! let value = env.read(0, |handle| handle.read_owned(b"key_1"))?;
//! assert_eq!(value.as_deref(), Some(&b"mydataboy"[..]));
//!
//! env.close()?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use log::{debug, info};
use redb::{Database, Durability, ReadTransaction, ReadableDatabase, TableDefinition, WriteTransaction};

use crate::config::EnvConfig;
use crate::errors::{StoreError, StoreResult};
use crate::fs::ensure_location;
use crate::handle::{ReadHandle, ReadWriteHandle};

/// File name of the engine database inside an environment's location.
pub const DATA_FILE: &str = "data.redb";

pub(crate) type RawBytes = &'static [u8];

/// One independently addressed key/value table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubDatabase {
    index: usize,
    name: String,
}

impl SubDatabase {
    fn new(index: usize) -> Self {
        Self {
            index,
            name: index.to_string(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn definition(&self) -> TableDefinition<'_, RawBytes, RawBytes> {
        TableDefinition::new(&self.name)
    }
}

/// Shared handle to an open environment.
///
/// Cloning is cheap; every clone refers to the same engine database.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvInner>,
}

struct EnvInner {
    config: EnvConfig,
    db: RwLock<Option<Arc<Database>>>,
    subdatabases: Vec<SubDatabase>,
    live: AtomicUsize,
}

/// Counts an engine transaction as open until dropped.
pub(crate) struct EngineLease {
    inner: Arc<EnvInner>,
}

impl Drop for EngineLease {
    fn drop(&mut self) {
        self.inner.live.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Environment {
    /// Open (creating if needed) the environment described by `config`.
    ///
    /// Every sub-database is created up front, each in its own committed
    /// write transaction.
    pub fn open(config: EnvConfig) -> StoreResult<Self> {
        config.validate()?;

        if config.create_location {
            ensure_location(&config.location)?;
        }

        let data_path = config.location.join(DATA_FILE);
        let mut builder = Database::builder();
        if let Some(cache_size) = config.cache_size_bytes {
            builder.set_cache_size(cache_size);
        }
        let db = builder
            .create(&data_path)
            .map_err(|source| StoreError::Initialization {
                location: config.location.clone(),
                source,
            })?;

        let subdatabases: Vec<SubDatabase> =
            (0..config.subdatabase_count).map(SubDatabase::new).collect();
        for subdatabase in &subdatabases {
            let txn = db.begin_write()?;
            txn.open_table(subdatabase.definition())?;
            txn.commit()?;
        }

        info!(
            "opened environment at {:?} with {} sub-database(s)",
            config.location,
            subdatabases.len()
        );

        Ok(Self {
            inner: Arc::new(EnvInner {
                config,
                db: RwLock::new(Some(Arc::new(db))),
                subdatabases,
                live: AtomicUsize::new(0),
            }),
        })
    }

    /// Open with default settings at `location` with `subdatabase_count` tables.
    pub fn open_at<P: AsRef<Path>>(location: P, subdatabase_count: usize) -> StoreResult<Self> {
        Self::open(EnvConfig::new(location.as_ref(), subdatabase_count))
    }

    pub fn subdatabase(&self, index: usize) -> StoreResult<&SubDatabase> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        self.inner
            .subdatabases
            .get(index)
            .ok_or(StoreError::InvalidIndex {
                index,
                count: self.inner.subdatabases.len(),
            })
    }

    pub fn subdatabases(&self) -> &[SubDatabase] {
        &self.inner.subdatabases
    }

    pub fn subdatabase_count(&self) -> usize {
        self.inner.subdatabases.len()
    }

    pub fn location(&self) -> &Path {
        &self.inner.config.location
    }

    pub fn config(&self) -> &EnvConfig {
        &self.inner.config
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.inner.config.capacity_bytes
    }

    pub fn is_closed(&self) -> bool {
        self.db().is_none()
    }

    /// Number of engine transactions currently open against this environment.
    pub fn open_transactions(&self) -> usize {
        self.inner.live.load(Ordering::Acquire)
    }

    /// Close the engine database.
    ///
    /// Refuses with [`StoreError::Busy`] while transactions are open. Closing
    /// twice is a no-op; any other operation afterwards fails with
    /// [`StoreError::Closed`].
    pub fn close(&self) -> StoreResult<()> {
        let mut db = self
            .inner
            .db
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if db.is_none() {
            return Ok(());
        }
        let open = self.open_transactions();
        if open > 0 {
            return Err(StoreError::Busy(open));
        }
        drop(db.take());
        info!("closed environment at {:?}", self.inner.config.location);
        Ok(())
    }

    fn db(&self) -> RwLockReadGuard<'_, Option<Arc<Database>>> {
        self.inner.db.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lease plus engine handle. The close lock is released before the caller
    /// asks the engine for a transaction.
    fn engine_for_txn(&self) -> StoreResult<(Arc<Database>, EngineLease)> {
        let db = self.db();
        let db = db.as_ref().ok_or(StoreError::Closed)?;
        Ok((Arc::clone(db), self.lease()))
    }

    fn lease(&self) -> EngineLease {
        self.inner.live.fetch_add(1, Ordering::AcqRel);
        EngineLease {
            inner: Arc::clone(&self.inner),
        }
    }

    pub(crate) fn begin_read_engine(&self) -> StoreResult<(ReadTransaction, EngineLease)> {
        let (db, lease) = self.engine_for_txn()?;
        let txn = db.begin_read()?;
        Ok((txn, lease))
    }

    pub(crate) fn begin_write_engine(&self) -> StoreResult<(WriteTransaction, EngineLease)> {
        let (db, lease) = self.engine_for_txn()?;
        // may block behind another writer; the lease makes `close` report Busy
        let mut txn = db.begin_write()?;
        if !self.inner.config.sync_on_commit {
            txn.set_durability(Durability::None)?;
        }
        Ok((txn, lease))
    }

    /// Fail when committing `txn` would leave more storage allocated than the
    /// configured ceiling.
    pub(crate) fn check_capacity(&self, txn: &WriteTransaction) -> StoreResult<()> {
        let stats = txn.stats()?;
        let required = stats.allocated_pages() * stats.page_size() as u64;
        let limit = self.inner.config.capacity_bytes;
        debug!("commit needs {} of {} bytes", required, limit);
        if required > limit {
            return Err(StoreError::CapacityExceeded { limit, required });
        }
        Ok(())
    }

    /// Run `f` in a read-only scope on sub-database `index`.
    ///
    /// The scope is released whatever `f` returns.
    pub fn read<T, E, F>(&self, index: usize, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&ReadHandle<'_>) -> Result<T, E>,
    {
        let handle = ReadHandle::open(self, index)?;
        let outcome = f(&handle);
        handle.finish(outcome)
    }

    /// Run `f` in a read-write scope on sub-database `index`.
    ///
    /// Commits when `f` returns `Ok`, aborts when it returns `Err`.
    pub fn write<T, E, F>(&self, index: usize, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut ReadWriteHandle<'_>) -> Result<T, E>,
    {
        let mut handle = ReadWriteHandle::open(self, index)?;
        let outcome = f(&mut handle);
        handle.finish(outcome)
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("location", &self.inner.config.location)
            .field("subdatabases", &self.inner.subdatabases.len())
            .field("open_transactions", &self.open_transactions())
            .field("closed", &self.is_closed())
            .finish()
    }
}
