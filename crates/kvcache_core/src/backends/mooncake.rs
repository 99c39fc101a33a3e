//! Mooncake distributed store adapter.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use super::registry::BackendProvider;
use super::BackendType;
use crate::engine::{EngineLoader, LoadError, NativeResult, NativeStore, UnlinkedLoader};
use crate::error::{KvCacheError, KvResult};
use crate::store::{KvCacheStore, SetupParams, StoreState, STATUS_OK};

/// Adapter from [`KvCacheStore`] to a Mooncake native store session.
///
/// The session is loaded when the adapter is constructed, so an adapter only
/// exists if its engine could be loaded.
///
/// # Thread Safety
///
/// The Ready flag sits behind a read/write lock. Data operations hold the
/// read side for the length of the engine call; `setup` and `close` take the
/// write side and therefore wait for in-flight operations. Concurrency of
/// the data itself is left to the engine.
pub struct MooncakeStore {
    engine: Box<dyn NativeStore>,
    state: RwLock<StoreState>,
}

impl MooncakeStore {
    /// Loads a native session through `loader`.
    ///
    /// # Errors
    ///
    /// Returns [`KvCacheError::BackendNotFound`] carrying the load failure.
    pub fn new(loader: &dyn EngineLoader) -> KvResult<Self> {
        let engine = loader.load().map_err(|e| {
            KvCacheError::backend_not_found(BackendType::Mooncake.as_str(), e.to_string())
        })?;
        Ok(Self::with_engine(engine))
    }

    /// Wraps an already loaded native session.
    pub fn with_engine(engine: Box<dyn NativeStore>) -> Self {
        Self {
            engine,
            state: RwLock::new(StoreState::NotReady),
        }
    }

    /// The wrapped native session, for calls outside the unified contract.
    pub fn native(&self) -> &dyn NativeStore {
        self.engine.as_ref()
    }

    /// Acquires the state read guard if the store is Ready.
    fn ready(&self) -> KvResult<RwLockReadGuard<'_, StoreState>> {
        let state = self.state.read();
        if !state.is_ready() {
            return Err(KvCacheError::NotInitialized);
        }
        Ok(state)
    }

    /// Runs one keyed engine call on a Ready store, translating failures.
    fn call<T>(
        &self,
        operation: &'static str,
        key: &str,
        f: impl FnOnce(&dyn NativeStore) -> NativeResult<T>,
    ) -> KvResult<T> {
        let _state = self.ready()?;
        debug!(operation, key, "mooncake call");
        f(self.engine.as_ref()).map_err(|e| KvCacheError::storage(operation, key, e.message()))
    }
}

impl fmt::Debug for MooncakeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MooncakeStore")
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

impl KvCacheStore for MooncakeStore {
    fn backend_type(&self) -> BackendType {
        BackendType::Mooncake
    }

    fn state(&self) -> StoreState {
        *self.state.read()
    }

    fn setup(&self, params: &SetupParams) -> KvResult<i32> {
        params.validate()?;

        let mut state = self.state.write();
        if state.is_ready() {
            return Err(KvCacheError::invalid_operation(
                "store already initialized; call close() first",
            ));
        }

        let code = self.engine.setup(params).map_err(|e| {
            KvCacheError::store_initialization(format!("failed to setup mooncake store: {e}"))
        })?;

        if code == STATUS_OK {
            *state = StoreState::Ready;
            info!(
                host = params.local_hostname(),
                metadata = params.metadata_server(),
                protocol = %params.protocol(),
                device = params.device_name(),
                "mooncake store ready"
            );
        } else {
            warn!(code, "mooncake setup returned non-zero status");
        }
        Ok(code)
    }

    fn put(&self, key: &str, parts: &[&[u8]]) -> KvResult<i32> {
        let _state = self.ready()?;
        let engine = self.engine.as_ref();

        let result = match parts {
            [] => return Err(KvCacheError::validation("at least one value must be provided")),
            [value] => engine.put(key, value),
            _ if engine.supports_put_parts() => {
                debug!(key, parts = parts.len(), "mooncake put_parts");
                engine.put_parts(key, parts)
            }
            _ => {
                debug!(key, parts = parts.len(), "mooncake put of concatenated parts");
                engine.put(key, &parts.concat())
            }
        };
        result.map_err(|e| KvCacheError::storage("put", key, e.message()))
    }

    fn get(&self, key: &str) -> KvResult<Vec<u8>> {
        self.call("get", key, |engine| engine.get(key))
    }

    fn get_buffer(&self, key: &str) -> KvResult<Option<Bytes>> {
        self.call("get buffer for", key, |engine| engine.get_buffer(key))
    }

    fn get_size(&self, key: &str) -> KvResult<i64> {
        self.call("get size for", key, |engine| engine.get_size(key))
    }

    fn is_exist(&self, key: &str) -> KvResult<bool> {
        match self.call("check existence of", key, |engine| engine.is_exist(key))? {
            0 => Ok(false),
            1 => Ok(true),
            code => Err(KvCacheError::storage(
                "check existence of",
                key,
                format!("engine returned status {code}"),
            )),
        }
    }

    fn remove(&self, key: &str) -> KvResult<i32> {
        self.call("remove", key, |engine| engine.remove(key))
    }

    fn close(&self) -> KvResult<i32> {
        let mut state = self.state.write();
        if !state.is_ready() {
            return Ok(STATUS_OK);
        }

        let code = self
            .engine
            .close()
            .map_err(|e| KvCacheError::storage_unkeyed("close", e.message()))?;

        if code == STATUS_OK {
            *state = StoreState::NotReady;
            info!("mooncake store closed");
        } else {
            warn!(code, "mooncake close returned non-zero status");
        }
        Ok(code)
    }
}

/// Registry entry for the Mooncake backend.
#[derive(Clone)]
pub struct MooncakeProvider {
    loader: Arc<dyn EngineLoader>,
}

impl MooncakeProvider {
    /// Uses `loader` to obtain native sessions.
    pub fn new(loader: impl EngineLoader + 'static) -> Self {
        Self {
            loader: Arc::new(loader),
        }
    }

    /// A provider for builds without a linked Mooncake engine.
    pub fn unlinked() -> Self {
        Self::new(UnlinkedLoader::new("mooncake"))
    }
}

impl fmt::Debug for MooncakeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MooncakeProvider").finish_non_exhaustive()
    }
}

impl BackendProvider for MooncakeProvider {
    fn backend_type(&self) -> BackendType {
        BackendType::Mooncake
    }

    fn probe(&self) -> Result<(), LoadError> {
        self.loader.probe()
    }

    fn create(&self) -> Result<Box<dyn KvCacheStore>, LoadError> {
        let engine = self.loader.load()?;
        Ok(Box::new(MooncakeStore::with_engine(engine)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FnLoader, NativeError};
    use crate::memory::InMemoryEngine;

    fn params() -> SetupParams {
        SetupParams::new("h1", "127.0.0.1:2379", 1024, 1024)
    }

    fn ready_store(engine: InMemoryEngine) -> MooncakeStore {
        let store = MooncakeStore::with_engine(Box::new(engine));
        assert_eq!(store.setup(&params()).unwrap(), 0);
        store
    }

    /// Engine whose calls all fail, for error translation tests.
    struct BrokenEngine;

    impl NativeStore for BrokenEngine {
        fn setup(&self, _params: &SetupParams) -> NativeResult<i32> {
            Err(NativeError::new("metadata server unreachable"))
        }
        fn put(&self, _key: &str, _value: &[u8]) -> NativeResult<i32> {
            Err(NativeError::new("no segment"))
        }
        fn get(&self, _key: &str) -> NativeResult<Vec<u8>> {
            Err(NativeError::new("transfer failed"))
        }
        fn get_buffer(&self, _key: &str) -> NativeResult<Option<Bytes>> {
            Err(NativeError::new("transfer failed"))
        }
        fn get_size(&self, _key: &str) -> NativeResult<i64> {
            Err(NativeError::new("rpc timeout"))
        }
        fn is_exist(&self, _key: &str) -> NativeResult<i32> {
            Ok(-3)
        }
        fn remove(&self, _key: &str) -> NativeResult<i32> {
            Err(NativeError::new("rpc timeout"))
        }
        fn close(&self) -> NativeResult<i32> {
            Err(NativeError::new("still referenced"))
        }
    }

    #[test]
    fn new_fails_when_engine_cannot_load() {
        let err = MooncakeStore::new(&UnlinkedLoader::new("mooncake")).unwrap_err();
        assert!(matches!(err, KvCacheError::BackendNotFound { .. }));
        assert!(err.to_string().contains("not linked"));
    }

    #[test]
    fn new_with_loader() {
        let loader = FnLoader::new(|| Ok(Box::new(InMemoryEngine::new()) as Box<dyn NativeStore>));
        let store = MooncakeStore::new(&loader).unwrap();
        assert_eq!(store.state(), StoreState::NotReady);
    }

    #[test]
    fn setup_transitions_to_ready() {
        let store = ready_store(InMemoryEngine::new());
        assert!(store.is_ready());
        assert!(store.get("missing").unwrap().is_empty());
        assert!(store.get_size("missing").unwrap() < 0);
        assert!(!store.is_exist("missing").unwrap());
    }

    #[test]
    fn setup_twice_is_invalid() {
        let store = ready_store(InMemoryEngine::new());
        let err = store.setup(&params()).unwrap_err();
        assert!(matches!(err, KvCacheError::InvalidOperation { .. }));
        assert!(store.is_ready());
    }

    #[test]
    fn setup_rejects_zero_sizes_before_engine() {
        let store = MooncakeStore::with_engine(Box::new(InMemoryEngine::new()));
        let err = store
            .setup(&SetupParams::new("h1", "127.0.0.1:2379", 0, 1024))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(!store.is_ready());
    }

    #[test]
    fn setup_failure_stays_not_ready() {
        let store = MooncakeStore::with_engine(Box::new(BrokenEngine));
        let err = store.setup(&params()).unwrap_err();
        assert!(matches!(err, KvCacheError::StoreInitialization { .. }));
        assert!(err.to_string().contains("metadata server unreachable"));
        assert_eq!(store.state(), StoreState::NotReady);
    }

    #[test]
    fn operations_before_setup_fail() {
        let engine = InMemoryEngine::with_data([("k", b"v".to_vec())]);
        let store = MooncakeStore::with_engine(Box::new(engine));

        assert!(matches!(store.get("k"), Err(KvCacheError::NotInitialized)));
        assert!(matches!(store.get_buffer("k"), Err(KvCacheError::NotInitialized)));
        assert!(matches!(store.get_size("k"), Err(KvCacheError::NotInitialized)));
        assert!(matches!(store.is_exist("k"), Err(KvCacheError::NotInitialized)));
        assert!(matches!(store.remove("k"), Err(KvCacheError::NotInitialized)));
        assert!(matches!(
            store.put_value("k", b"x"),
            Err(KvCacheError::NotInitialized)
        ));
        assert!(matches!(store.put("k", &[]), Err(KvCacheError::NotInitialized)));
    }

    #[test]
    fn put_without_parts_is_validation_error() {
        let store = ready_store(InMemoryEngine::new());
        assert!(store.put("k", &[]).unwrap_err().is_validation());
        assert!(!store.is_exist("k").unwrap());
    }

    #[test]
    fn put_parts_uses_native_primitive() {
        let store = ready_store(InMemoryEngine::new());
        store.put("k", &[b"a".as_slice(), b"b".as_slice()]).unwrap();
        assert_eq!(store.get("k").unwrap(), b"ab");
    }

    #[test]
    fn put_parts_falls_back_to_concatenation() {
        let store = ready_store(InMemoryEngine::new().without_put_parts());
        assert_eq!(store.put("k", &[b"a".as_slice(), b"b".as_slice()]).unwrap(), 0);
        assert_eq!(store.get("k").unwrap(), b"ab");
    }

    #[test]
    fn get_buffer_distinguishes_empty_from_absent() {
        let store = ready_store(InMemoryEngine::new());
        store.put_value("empty", b"").unwrap();
        assert_eq!(store.get_buffer("empty").unwrap().unwrap().len(), 0);
        assert!(store.get_buffer("absent").unwrap().is_none());
    }

    #[test]
    fn engine_errors_keep_context() {
        let store = MooncakeStore::with_engine(Box::new(BrokenEngine));
        *store.state.write() = StoreState::Ready;

        let err = store.put_value("k1", b"v").unwrap_err();
        assert_eq!(err.to_string(), "storage error: failed to put key 'k1': no segment");

        let err = store.get("k2").unwrap_err();
        assert!(matches!(err, KvCacheError::Storage { operation: "get", .. }));
        assert!(err.to_string().contains("transfer failed"));

        let err = store.is_exist("k3").unwrap_err();
        assert!(err.to_string().contains("status -3"));

        let err = store.close().unwrap_err();
        assert!(err.to_string().contains("still referenced"));
        assert!(store.is_ready());
    }

    #[test]
    fn close_is_idempotent() {
        let store = ready_store(InMemoryEngine::new());
        assert_eq!(store.close().unwrap(), 0);
        assert_eq!(store.close().unwrap(), 0);
        assert!(matches!(store.get("k"), Err(KvCacheError::NotInitialized)));
    }

    #[test]
    fn close_before_setup_does_not_touch_engine() {
        let store = MooncakeStore::with_engine(Box::new(BrokenEngine));
        assert_eq!(store.close().unwrap(), 0);
    }

    #[test]
    fn native_accessor() {
        let store = ready_store(InMemoryEngine::new());
        store.put_value("k", b"v").unwrap();
        assert_eq!(store.native().is_exist("k").unwrap(), 1);
    }

    #[test]
    fn provider_reports_loader_state() {
        assert!(MooncakeProvider::unlinked().probe().is_err());
        assert!(MooncakeProvider::unlinked().create().is_err());

        let provider = MooncakeProvider::new(FnLoader::new(|| {
            Ok(Box::new(InMemoryEngine::new()) as Box<dyn NativeStore>)
        }));
        assert!(provider.probe().is_ok());
        let store = provider.create().unwrap();
        assert_eq!(store.backend_type(), BackendType::Mooncake);
    }
}
