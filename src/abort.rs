//! Abort signals.
//!
//! An abort is an ordinary error value. Every transaction scope looks at the
//! `Result` its own body produced: `Ok` commits, any `Err` aborts. Returning
//! the error with `?` therefore aborts each enclosing scope in turn, down to
//! the root, without any shared flag that a second failure could reset.
//!
//! ```rust,no_run
//! use txscope::{Environment, StoreError, abort};
//!
//! # fn example(env: &Environment) -> Result<(), StoreError> {
//! let result: Result<(), StoreError> = env.write(0, |handle| {
//!     handle.write(b"balance", b"100")?;
//!     abort::raise("insufficient funds")
//! });
//! assert!(result.unwrap_err().is_abort());
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;

use thiserror::Error;

use crate::errors::StoreError;

/// Request to discard the enclosing transaction scopes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Transaction Aborted: {reason}")]
pub struct AbortSignal {
    reason: Cow<'static, str>,
}

impl AbortSignal {
    pub fn new(reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub(crate) fn doomed_by_nested_scope() -> Self {
        Self::new("a nested scope sharing this transaction was aborted")
    }
}

/// Raise an abort signal in any error type a scope body can return.
pub fn raise<T, E>(reason: impl Into<Cow<'static, str>>) -> Result<T, E>
where
    E: From<StoreError>,
{
    Err(E::from(StoreError::Aborted(AbortSignal::new(reason))))
}
