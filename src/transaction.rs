//! Transaction scopes.
//!
//! A [`Transaction`] owns exactly one engine transaction, or shares the one
//! owned by an ancestor. Root transactions are opened from an
//! [`Environment`]; nested transactions are opened from an explicit parent
//! reference, and the parent stays borrowed until the child is finished. The
//! innermost open transaction is therefore always the only usable one, and
//! finishing it hands control back to its parent on every exit path.
//!
//! # Nesting rules
//!
//! | parent engine txn | child mode  | child engine txn                     |
//! |-------------------|-------------|--------------------------------------|
//! | write             | any         | joins the parent's write transaction |
//! | read              | read-only   | joins the parent's snapshot          |
//! | read              | read-write  | opens its own write transaction      |
//!
//! A writer nested in a writer must join: the engine admits a single writer,
//! so a second write transaction on the same thread would wait on itself.
//!
//! # Commit and abort
//!
//! - [`Transaction::commit`] commits an owned write transaction, releases an
//!   owned read snapshot, and does nothing for a joined transaction (its owner
//!   commits).
//! - [`Transaction::abort`] aborts an owned transaction. A joined transaction
//!   cannot discard writes on its own, so aborting a joined read-write scope,
//!   or a joined read-only scope with read-write scopes below it that wrote,
//!   dooms the owner: the owner's commit turns into an abort and reports
//!   [`StoreError::Aborted`].
//! - [`Transaction::finish`] commits on `Ok` and aborts on `Err`.
//! - Dropping an unfinished transaction aborts it.
//!
//! Releasing a read-only transaction never surfaces an error; a failure there
//! is logged and treated as an abort, since nothing can be lost.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use redb::{ReadTransaction, WriteTransaction};

use crate::abort::AbortSignal;
use crate::environment::{EngineLease, Environment};
use crate::errors::{StoreError, StoreResult};
use crate::handle::{ReadHandle, ReadWriteHandle};

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum TxnMode {
    ReadOnly,
    ReadWrite,
}

enum Engine<'p> {
    Read(ReadTransaction),
    Write(WriteTransaction),
    Joined(&'p Transaction<'p>),
}

/// Borrowed view of the engine transaction a scope runs in.
pub(crate) enum EngineRef<'a> {
    Read(&'a ReadTransaction),
    Write(&'a WriteTransaction),
}

pub struct Transaction<'p> {
    env: Environment,
    engine: Option<Engine<'p>>,
    parent: Option<&'p Transaction<'p>>,
    mode: TxnMode,
    id: u64,
    depth: usize,
    doomed: Cell<bool>,
    // a joined read-write scope at or below this one has written
    dirty: Cell<bool>,
    // dropped after the engine transaction
    _lease: Option<EngineLease>,
}

impl Transaction<'static> {
    /// Open a root transaction.
    pub fn begin(env: &Environment, mode: TxnMode) -> StoreResult<Self> {
        let (engine, lease) = match mode {
            TxnMode::ReadOnly => {
                let (txn, lease) = env.begin_read_engine()?;
                (Engine::Read(txn), lease)
            }
            TxnMode::ReadWrite => {
                let (txn, lease) = env.begin_write_engine()?;
                (Engine::Write(txn), lease)
            }
        };
        Ok(Self::assemble(env.clone(), engine, None, mode, Some(lease)))
    }

    pub fn begin_read(env: &Environment) -> StoreResult<Self> {
        Self::begin(env, TxnMode::ReadOnly)
    }

    pub fn begin_write(env: &Environment) -> StoreResult<Self> {
        Self::begin(env, TxnMode::ReadWrite)
    }
}

impl<'p> Transaction<'p> {
    fn assemble(
        env: Environment,
        engine: Engine<'p>,
        parent: Option<&'p Transaction<'p>>,
        mode: TxnMode,
        lease: Option<EngineLease>,
    ) -> Self {
        let txn = Transaction {
            env,
            engine: Some(engine),
            parent,
            mode,
            id: NEXT_TXN_ID.fetch_add(1, Ordering::Relaxed),
            depth: parent.map_or(0, |p| p.depth + 1),
            doomed: Cell::new(false),
            dirty: Cell::new(false),
            _lease: lease,
        };
        debug!(
            "txn {} begin: {} depth={} joined={}",
            txn.id,
            txn.mode,
            txn.depth,
            txn.is_joined()
        );
        txn
    }

    /// Open a transaction nested inside this one.
    pub fn nested(&self, mode: TxnMode) -> StoreResult<Transaction<'_>> {
        let parent_writes = matches!(self.engine()?, EngineRef::Write(_));
        if parent_writes || mode == TxnMode::ReadOnly {
            return Ok(Transaction::assemble(
                self.env.clone(),
                Engine::Joined(self),
                Some(self),
                mode,
                None,
            ));
        }

        let (txn, lease) = self.env.begin_write_engine()?;
        Ok(Transaction::assemble(
            self.env.clone(),
            Engine::Write(txn),
            Some(self),
            mode,
            Some(lease),
        ))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn mode(&self) -> TxnMode {
        self.mode
    }

    pub fn is_read_only(&self) -> bool {
        self.mode == TxnMode::ReadOnly
    }

    /// Nesting depth; roots are at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The transaction this one was opened from.
    pub fn parent(&self) -> Option<&'p Transaction<'p>> {
        self.parent
    }

    /// Enclosing transactions, innermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = &'p Transaction<'p>> {
        std::iter::successors(self.parent, |txn| txn.parent)
    }

    /// Whether this transaction runs inside an ancestor's engine transaction.
    pub fn is_joined(&self) -> bool {
        matches!(self.engine, Some(Engine::Joined(_)))
    }

    /// Whether a nested scope sharing this transaction has been aborted.
    pub fn is_doomed(&self) -> bool {
        match &self.engine {
            Some(Engine::Joined(parent)) => parent.is_doomed(),
            _ => self.doomed.get(),
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub(crate) fn engine(&self) -> StoreResult<EngineRef<'_>> {
        match &self.engine {
            Some(Engine::Read(txn)) => Ok(EngineRef::Read(txn)),
            Some(Engine::Write(txn)) => Ok(EngineRef::Write(txn)),
            Some(Engine::Joined(parent)) => parent.engine(),
            None => Err(StoreError::Closed),
        }
    }

    pub(crate) fn write_engine(&self) -> StoreResult<&WriteTransaction> {
        if self.is_read_only() {
            return Err(StoreError::ReadOnly);
        }
        match self.engine()? {
            EngineRef::Write(txn) => {
                self.mark_dirty();
                Ok(txn)
            }
            EngineRef::Read(_) => Err(StoreError::ReadOnly),
        }
    }

    fn mark_dirty(&self) {
        self.dirty.set(true);
        if let Some(Engine::Joined(parent)) = &self.engine {
            parent.mark_dirty();
        }
    }

    fn doom(&self) {
        match &self.engine {
            Some(Engine::Joined(parent)) => parent.doom(),
            _ => self.doomed.set(true),
        }
    }

    /// Commit this scope.
    pub fn commit(mut self) -> StoreResult<()> {
        match self.engine.take() {
            Some(Engine::Joined(_)) => {
                debug!("txn {} commit deferred to owner", self.id);
                Ok(())
            }
            Some(Engine::Read(txn)) => {
                if let Err(err) = txn.close() {
                    warn!("txn {} read release failed, treated as abort: {}", self.id, err);
                }
                debug!("txn {} released", self.id);
                Ok(())
            }
            Some(Engine::Write(txn)) => self.commit_write(txn),
            None => Ok(()),
        }
    }

    fn commit_write(&self, txn: WriteTransaction) -> StoreResult<()> {
        if self.doomed.get() {
            self.abort_write(txn);
            return Err(AbortSignal::doomed_by_nested_scope().into());
        }
        if let Err(err) = self.env.check_capacity(&txn) {
            self.abort_write(txn);
            return Err(err);
        }
        txn.commit()?;
        debug!("txn {} committed", self.id);
        Ok(())
    }

    fn abort_write(&self, txn: WriteTransaction) {
        match txn.abort() {
            Ok(()) => debug!("txn {} aborted", self.id),
            Err(err) => warn!("txn {} abort failed: {}", self.id, err),
        }
    }

    /// Abort this scope, discarding its writes.
    pub fn abort(mut self) -> StoreResult<()> {
        match self.engine.take() {
            Some(engine) => self.discard(engine),
            None => Ok(()),
        }
    }

    fn discard(&self, engine: Engine<'p>) -> StoreResult<()> {
        match engine {
            Engine::Joined(parent) => {
                if self.mode == TxnMode::ReadWrite || self.dirty.get() {
                    parent.doom();
                    debug!("txn {} aborted, owner doomed", self.id);
                }
                Ok(())
            }
            Engine::Read(txn) => {
                drop(txn);
                debug!("txn {} released", self.id);
                Ok(())
            }
            Engine::Write(txn) => {
                txn.abort()?;
                debug!("txn {} aborted", self.id);
                Ok(())
            }
        }
    }

    /// Commit on `Ok`, abort on `Err`, and hand the outcome back.
    pub fn finish<T, E>(self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        match outcome {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                let id = self.id;
                if let Err(abort_err) = self.abort() {
                    warn!("txn {} abort failed: {}", id, abort_err);
                }
                Err(err)
            }
        }
    }

    /// Run `f` against a nested read handle on sub-database `index`.
    pub fn read_scope<T, E, F>(&self, index: usize, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&ReadHandle<'_>) -> Result<T, E>,
    {
        let handle = ReadHandle::nested(self, index)?;
        let outcome = f(&handle);
        handle.finish(outcome)
    }

    /// Run `f` against a nested read-write handle on sub-database `index`.
    pub fn write_scope<T, E, F>(&self, index: usize, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut ReadWriteHandle<'_>) -> Result<T, E>,
    {
        let mut handle = ReadWriteHandle::nested(self, index)?;
        let outcome = f(&mut handle);
        handle.finish(outcome)
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            debug!("txn {} dropped unfinished", self.id);
            if let Err(err) = self.discard(engine) {
                warn!("txn {} abort on drop failed: {}", self.id, err);
            }
        }
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("depth", &self.depth)
            .field("joined", &self.is_joined())
            .field("doomed", &self.is_doomed())
            .finish()
    }
}
