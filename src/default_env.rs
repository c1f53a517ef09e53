//! Process-wide default environment.
//!
//! Opened lazily on the first call to [`environment`] and kept until the
//! process exits. The sub-database count (or the whole configuration) may be
//! set beforehand; once the environment is open, changing it is an error.

use std::sync::{Mutex, OnceLock, PoisonError};

use log::info;

use crate::config::EnvConfig;
use crate::environment::Environment;
use crate::errors::{StoreError, StoreResult};

pub const DEFAULT_LOCATION: &str = "./db_storage";
pub const DEFAULT_SUBDATABASE_COUNT: usize = 1;

static DEFAULT: OnceLock<Environment> = OnceLock::new();
static PENDING: Mutex<Option<EnvConfig>> = Mutex::new(None);

fn default_config() -> EnvConfig {
    EnvConfig::new(DEFAULT_LOCATION, DEFAULT_SUBDATABASE_COUNT)
}

fn already_open() -> StoreError {
    StoreError::Configuration("default environment is already open".to_string())
}

/// Set the number of sub-databases the default environment opens with.
pub fn set_subdatabase_count(count: usize) -> StoreResult<()> {
    let mut pending = PENDING.lock().unwrap_or_else(PoisonError::into_inner);
    if DEFAULT.get().is_some() {
        return Err(already_open());
    }
    pending.get_or_insert_with(default_config).subdatabase_count = count;
    Ok(())
}

/// Replace the whole configuration of the default environment.
pub fn configure(config: EnvConfig) -> StoreResult<()> {
    let mut pending = PENDING.lock().unwrap_or_else(PoisonError::into_inner);
    if DEFAULT.get().is_some() {
        return Err(already_open());
    }
    *pending = Some(config);
    Ok(())
}

/// The default environment, opened on first use.
pub fn environment() -> StoreResult<&'static Environment> {
    if let Some(env) = DEFAULT.get() {
        return Ok(env);
    }

    let mut pending = PENDING.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(env) = DEFAULT.get() {
        return Ok(env);
    }

    let config = pending.take().unwrap_or_else(default_config);
    match Environment::open(config.clone()) {
        Ok(env) => {
            info!("default environment opened at {:?}", config.location);
            Ok(DEFAULT.get_or_init(|| env))
        }
        Err(err) => {
            *pending = Some(config);
            Err(err)
        }
    }
}
