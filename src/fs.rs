//! Storage location setup.

use std::path::Path;

use crate::errors::{StoreError, StoreResult};

/// Make sure every directory component of `location` exists.
pub fn ensure_location(location: &Path) -> StoreResult<()> {
    std::fs::create_dir_all(location).map_err(|source| StoreError::Location {
        location: location.to_path_buf(),
        source,
    })
}
