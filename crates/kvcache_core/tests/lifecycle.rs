//! Integration tests for the store lifecycle across registry, adapters and
//! configuration.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use kvcache_core::{
    create_store_from_config, get_client_with_config, with_scoped_store, BackendRegistry,
    BackendType, FnLoader, InMemoryEngine, KvCacheConfig, KvCacheError, KvCacheStore,
    MooncakeStore, NativeStore, ScopedStore, SetupParams,
};

fn params() -> SetupParams {
    SetupParams::new("h1", "127.0.0.1:2379", 1024, 1024)
}

/// A registry whose Mooncake sessions all share one in-memory engine.
fn shared_registry(engine: Arc<InMemoryEngine>) -> BackendRegistry {
    BackendRegistry::builtin().with_mooncake_loader(FnLoader::new(move || {
        Ok(Box::new(SharedEngine(Arc::clone(&engine))) as Box<dyn NativeStore>)
    }))
}

struct SharedEngine(Arc<InMemoryEngine>);

impl NativeStore for SharedEngine {
    fn setup(&self, params: &SetupParams) -> kvcache_core::NativeResult<i32> {
        self.0.setup(params)
    }
    fn put(&self, key: &str, value: &[u8]) -> kvcache_core::NativeResult<i32> {
        self.0.put(key, value)
    }
    fn supports_put_parts(&self) -> bool {
        self.0.supports_put_parts()
    }
    fn put_parts(&self, key: &str, parts: &[&[u8]]) -> kvcache_core::NativeResult<i32> {
        self.0.put_parts(key, parts)
    }
    fn get(&self, key: &str) -> kvcache_core::NativeResult<Vec<u8>> {
        self.0.get(key)
    }
    fn get_buffer(&self, key: &str) -> kvcache_core::NativeResult<Option<bytes::Bytes>> {
        self.0.get_buffer(key)
    }
    fn get_size(&self, key: &str) -> kvcache_core::NativeResult<i64> {
        self.0.get_size(key)
    }
    fn is_exist(&self, key: &str) -> kvcache_core::NativeResult<i32> {
        self.0.is_exist(key)
    }
    fn remove(&self, key: &str) -> kvcache_core::NativeResult<i32> {
        self.0.remove(key)
    }
    fn close(&self) -> kvcache_core::NativeResult<i32> {
        self.0.close()
    }
}

#[test]
fn setup_scenario() {
    let registry = shared_registry(Arc::new(InMemoryEngine::new()));
    let store = registry.create_store(BackendType::Mooncake).unwrap();

    assert_eq!(store.setup(&params()).unwrap(), 0);
    assert!(store.get("missing").unwrap().is_empty());
    assert!(store.get_size("missing").unwrap() < 0);
    assert!(!store.is_exist("missing").unwrap());
}

#[test]
fn multi_part_put_without_native_primitive() {
    let store = MooncakeStore::with_engine(Box::new(InMemoryEngine::new().without_put_parts()));
    store.setup(&params()).unwrap();

    assert_eq!(store.put("k", &[b"a".as_slice(), b"b".as_slice()]).unwrap(), 0);
    assert_eq!(store.get("k").unwrap(), b"ab");
    assert_eq!(store.get_size("k").unwrap(), 2);
}

#[test]
fn zero_part_put_is_rejected() {
    let engine = Arc::new(InMemoryEngine::new());
    let store = shared_registry(Arc::clone(&engine))
        .create_store(BackendType::Mooncake)
        .unwrap();
    store.setup(&params()).unwrap();

    let err = store.put("k", &[]).unwrap_err();
    assert!(err.is_validation());
    assert!(engine.is_empty());
}

#[test]
fn single_available_backend_is_detected() {
    let registry = shared_registry(Arc::new(InMemoryEngine::new()));
    assert_eq!(registry.list_available_backends().len(), 1);
    assert_eq!(registry.detect_best_backend().unwrap(), BackendType::Mooncake);
}

#[test]
fn unknown_backend_name() {
    let registry = BackendRegistry::builtin();
    assert!(matches!(
        registry.create_store_by_name("redis"),
        Err(KvCacheError::BackendNotFound { .. })
    ));
    assert!(matches!(
        "redis".parse::<BackendType>(),
        Err(KvCacheError::BackendNotFound { .. })
    ));
}

#[test]
fn not_ready_operations_never_reach_engine() {
    let engine = Arc::new(InMemoryEngine::with_data([("k", b"v".to_vec())]));
    let store = shared_registry(Arc::clone(&engine))
        .create_store(BackendType::Mooncake)
        .unwrap();

    assert!(matches!(store.put_value("k", b"x"), Err(KvCacheError::NotInitialized)));
    assert!(matches!(store.remove("k"), Err(KvCacheError::NotInitialized)));
    assert_eq!(engine.get("k").unwrap(), b"v");
}

#[test]
fn double_close_is_idempotent() {
    let store = shared_registry(Arc::new(InMemoryEngine::new()))
        .create_store(BackendType::Mooncake)
        .unwrap();
    store.setup(&params()).unwrap();

    assert_eq!(store.close().unwrap(), 0);
    assert_eq!(store.close().unwrap(), 0);
    assert!(matches!(store.get("k"), Err(KvCacheError::NotInitialized)));
}

#[test]
fn setup_after_close_reconnects() {
    let engine = Arc::new(InMemoryEngine::new());
    let store = shared_registry(Arc::clone(&engine))
        .create_store(BackendType::Mooncake)
        .unwrap();

    store.setup(&params()).unwrap();
    store.put_value("k", b"v").unwrap();
    store.close().unwrap();

    store.setup(&params()).unwrap();
    assert_eq!(store.get("k").unwrap(), b"v");
}

#[test]
fn config_driven_store() {
    let engine = Arc::new(InMemoryEngine::new());
    let registry = shared_registry(Arc::clone(&engine));
    let config = KvCacheConfig::from_yaml_str(
        "local_hostname: worker03\nmetadata_server: 10.0.0.5:2379\nbackend: MOONCAKE\n",
    )
    .unwrap();

    let store = create_store_from_config(&registry, &config).unwrap();
    assert!(store.is_ready());
    let session = engine.session().unwrap();
    assert_eq!(session.local_hostname(), "worker03");
    assert_eq!(session.metadata_server(), "10.0.0.5:2379");
    assert_eq!(session.master_server_address(), Some("127.0.0.1:50051"));

    let err = get_client_with_config(store.as_ref(), &config).unwrap_err();
    assert!(err.is_state_error());
}

#[test]
fn config_selecting_placeholder_backend() {
    let config = KvCacheConfig::builder()
        .backend(BackendType::Rust)
        .build()
        .unwrap();
    let registry = shared_registry(Arc::new(InMemoryEngine::new()));

    let err = create_store_from_config(&registry, &config).unwrap_err();
    assert!(matches!(err, KvCacheError::BackendNotFound { ref backend, .. } if backend == "rust"));
}

#[test]
fn scoped_store_closes_on_early_return() {
    let engine = Arc::new(InMemoryEngine::new());
    let registry = shared_registry(Arc::clone(&engine));

    let run = || -> Result<(), KvCacheError> {
        let store = ScopedStore::new(registry.create_store(BackendType::Mooncake)?);
        store.setup(&params())?;
        assert!(engine.session().is_some());
        store.remove("k")?;
        Err(KvCacheError::key_not_found("k"))
    };

    assert!(matches!(run(), Err(KvCacheError::KeyNotFound { .. })));
    assert!(engine.session().is_none());
}

#[test]
fn scoped_store_closes_on_panic() {
    let engine = Arc::new(InMemoryEngine::new());
    let registry = shared_registry(Arc::clone(&engine));

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let store = ScopedStore::new(registry.create_store(BackendType::Mooncake).unwrap());
        store.setup(&params()).unwrap();
        panic!("worker failed");
    }));

    assert!(result.is_err());
    assert!(engine.session().is_none());
}

#[test]
fn with_scoped_store_prefers_closure_error() {
    let engine = Arc::new(InMemoryEngine::new());
    let store = shared_registry(Arc::clone(&engine))
        .create_store(BackendType::Mooncake)
        .unwrap();

    let result: Result<(), _> = with_scoped_store(store, |s| {
        s.setup(&params())?;
        Err(KvCacheError::invalid_operation("abort"))
    });

    assert!(matches!(result, Err(KvCacheError::InvalidOperation { .. })));
    assert!(engine.session().is_none());
}

#[test]
fn with_scoped_store_returns_value() {
    let store = shared_registry(Arc::new(InMemoryEngine::new()))
        .create_store(BackendType::Mooncake)
        .unwrap();

    let value = with_scoped_store(store, |s| {
        s.setup(&params())?;
        s.put("k", &[b"x".as_slice(), b"y".as_slice()])?;
        s.get("k")
    })
    .unwrap();
    assert_eq!(value, b"xy");
}
