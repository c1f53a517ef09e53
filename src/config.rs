//! Environment configuration.
//!
//! Built with `typed-builder`; only the location is required.

use std::path::PathBuf;
use typed_builder::TypedBuilder;

use crate::errors::{StoreError, StoreResult};

/// Upper bound on sub-databases per environment unless configured otherwise.
pub const DEFAULT_MAX_SUBDATABASES: usize = 50;

/// Default capacity ceiling: 10000 × 10 MiB.
pub const DEFAULT_CAPACITY_BYTES: u64 = 10_485_760 * 10_000;

/// Configuration for opening an [`Environment`](crate::Environment).
///
/// # Examples
///
/// ```
/// use txscope::config::EnvConfig;
///
/// let config = EnvConfig::builder()
///     .location("./data/accounts")
///     .subdatabase_count(3)
///     .capacity_bytes(64 * 1024 * 1024)
///     .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
pub struct EnvConfig {
    /// Directory holding the environment's data file
    #[builder(setter(into))]
    pub location: PathBuf,

    /// Number of sub-databases opened eagerly at startup
    #[builder(default = 1)]
    pub subdatabase_count: usize,

    /// Maximum number of sub-databases this environment may hold
    #[builder(default = DEFAULT_MAX_SUBDATABASES)]
    pub max_subdatabases: usize,

    /// Hard cap on allocated storage, in bytes
    #[builder(default = DEFAULT_CAPACITY_BYTES)]
    pub capacity_bytes: u64,

    /// Engine page cache size in bytes (engine default when unset)
    #[builder(default, setter(strip_option))]
    pub cache_size_bytes: Option<usize>,

    /// Sync to disk on every commit
    #[builder(default = true)]
    pub sync_on_commit: bool,

    /// Create missing directory components of `location` before opening
    #[builder(default = true)]
    pub create_location: bool,
}

impl EnvConfig {
    /// Configuration with defaults for everything but location and count.
    pub fn new<P: Into<PathBuf>>(location: P, subdatabase_count: usize) -> Self {
        Self::builder()
            .location(location)
            .subdatabase_count(subdatabase_count)
            .build()
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.subdatabase_count > self.max_subdatabases {
            return Err(StoreError::Configuration(format!(
                "{} sub-databases requested, maximum is {}",
                self.subdatabase_count, self.max_subdatabases
            )));
        }
        if self.capacity_bytes == 0 {
            return Err(StoreError::Configuration(
                "capacity ceiling must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
