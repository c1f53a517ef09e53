pub use crate::abort::{self, AbortSignal};
pub use crate::config::EnvConfig;
pub use crate::environment::{Environment, SubDatabase};
pub use crate::errors::{StoreError, StoreResult};
pub use crate::guards::ReadView;
pub use crate::handle::{ReadAccess, ReadHandle, ReadWriteHandle};
pub use crate::transaction::{Transaction, TxnMode};
