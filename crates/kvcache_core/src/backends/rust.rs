//! Placeholder for a native Rust engine backend.
//!
//! The backend is registered so it shows up in listings, but it never loads.
//! [`RustStore`] has no values: the type checker proves that no handle of
//! this backend can reach a caller.

use bytes::Bytes;

use super::registry::BackendProvider;
use super::BackendType;
use crate::engine::LoadError;
use crate::error::{KvCacheError, KvResult};
use crate::store::{KvCacheStore, SetupParams, StoreState};

const NOT_IMPLEMENTED: &str = "rust backend is not implemented";

/// Store handle of the Rust backend. Uninhabited.
#[derive(Debug)]
pub enum RustStore {}

impl RustStore {
    /// Always fails with [`KvCacheError::BackendNotFound`].
    ///
    /// # Errors
    ///
    /// Always.
    pub fn new() -> KvResult<Self> {
        Err(KvCacheError::backend_not_found(
            BackendType::Rust.as_str(),
            NOT_IMPLEMENTED,
        ))
    }
}

impl KvCacheStore for RustStore {
    fn backend_type(&self) -> BackendType {
        match *self {}
    }

    fn state(&self) -> StoreState {
        match *self {}
    }

    fn setup(&self, _params: &SetupParams) -> KvResult<i32> {
        match *self {}
    }

    fn put(&self, _key: &str, _parts: &[&[u8]]) -> KvResult<i32> {
        match *self {}
    }

    fn get(&self, _key: &str) -> KvResult<Vec<u8>> {
        match *self {}
    }

    fn get_buffer(&self, _key: &str) -> KvResult<Option<Bytes>> {
        match *self {}
    }

    fn get_size(&self, _key: &str) -> KvResult<i64> {
        match *self {}
    }

    fn is_exist(&self, _key: &str) -> KvResult<bool> {
        match *self {}
    }

    fn remove(&self, _key: &str) -> KvResult<i32> {
        match *self {}
    }

    fn close(&self) -> KvResult<i32> {
        match *self {}
    }
}

/// Registry entry for the Rust backend. Never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustProvider;

impl BackendProvider for RustProvider {
    fn backend_type(&self) -> BackendType {
        BackendType::Rust
    }

    fn probe(&self) -> Result<(), LoadError> {
        Err(LoadError::new(NOT_IMPLEMENTED))
    }

    fn create(&self) -> Result<Box<dyn KvCacheStore>, LoadError> {
        let store = RustStore::new().map_err(|_| LoadError::new(NOT_IMPLEMENTED))?;
        Ok(Box::new(store))
    }
}
