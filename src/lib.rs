//! # txscope
//!
//! Scoped, nestable transactions over the sub-databases of an embedded redb
//! environment.
//!
//! ## Features
//!
//! - **Environments**: one on-disk database holding a fixed set of
//!   index-addressed sub-databases, opened eagerly
//! - **Scopes**: read and read-write handles that commit on success and abort
//!   on error or drop
//! - **Nesting**: child scopes take their parent explicitly and share its write
//!   transaction where the engine requires it
//! - **Abort propagation**: an error returned through nested scopes aborts
//!   every one of them
//! - **Zero-copy reads**: values are borrowed straight from engine pages
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use txscope::prelude::*;
//!
//! # fn main() -> Result<(), StoreError> {
//! let env = Environment::open_at("./test_db", 3)?;
//!
//! // Write data
//! let mut writer = ReadWriteHandle::open(&env, 0)?;
//! writer.write(b"key_1", b"mydataboy")?;
//! writer.commit()?;
//!
//! // Read data
//! let reader = ReadHandle::open(&env, 0)?;
//! let value = reader.read(b"key_1")?;
//! assert!(matches!(value, Some(ref view) if *view == "mydataboy"));
//! drop(value);
//! reader.commit()?;
//!
//! // Nested scopes: the inner abort discards both writes
//! let result: StoreResult<()> = env.write(0, |outer| {
//!     outer.write(b"a", b"1")?;
//!     outer.transaction().write_scope(1, |inner| {
//!         inner.write(b"b", b"2")?;
//!         abort::raise("changed my mind")
//!     })
//! });
//! assert!(result.unwrap_err().is_abort());
//! # Ok(())
//! # }
//! ```

pub mod abort;
pub mod config;
pub mod default_env;
pub mod environment;
pub mod errors;
pub mod fs;
pub mod guards;
pub mod handle;
pub mod prelude;
pub mod transaction;

pub use abort::AbortSignal;
pub use config::EnvConfig;
pub use environment::{Environment, SubDatabase};
pub use errors::{StoreError, StoreResult};
pub use guards::ReadView;
pub use handle::{ReadAccess, ReadHandle, ReadWriteHandle};
pub use transaction::{Transaction, TxnMode};
