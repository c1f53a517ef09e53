// Common test utilities and helpers

#![allow(dead_code)]

use tempfile::TempDir;
use txscope::prelude::*;

/// Install a test logger once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Open an environment with `count` sub-databases in a fresh scratch directory.
///
/// The directory is removed when the returned `TempDir` is dropped, so keep it
/// alive for as long as the environment is used.
pub fn create_test_env(count: usize) -> (Environment, TempDir) {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let env = Environment::open_at(temp_dir.path().join("env"), count).unwrap();
    (env, temp_dir)
}

/// Commit `key -> value` into sub-database `index` in its own scope.
pub fn put(env: &Environment, index: usize, key: &[u8], value: &[u8]) {
    let mut handle = ReadWriteHandle::open(env, index).unwrap();
    handle.write(key, value).unwrap();
    handle.commit().unwrap();
}

/// Read `key` from sub-database `index` in a fresh read scope.
pub fn get(env: &Environment, index: usize, key: &[u8]) -> Option<Vec<u8>> {
    env.read(index, |handle| handle.read_owned(key)).unwrap()
}
