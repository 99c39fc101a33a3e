//! Test fixtures and store helpers.
//!
//! Provides sample configuration documents, temporary config files and
//! ready-to-use stores backed by [`ScriptedEngine`].

use std::path::{Path, PathBuf};

use kvcache_core::{
    BackendRegistry, KvCacheStore, MooncakeStore, ScopedStore, SetupParams,
};
use tempfile::TempDir;

use crate::engine::ScriptedEngine;

/// A complete legacy flat configuration.
pub const LEGACY_YAML: &str = r#"local_hostname: localhost
metadata_server: "127.0.0.1:2379"
global_segment_size: 3355443200
local_buffer_size: 536870912
protocol: tcp
device_name: lo
master_server_address: "127.0.0.1:50051"
backend: mooncake
log_level: INFO
enable_metrics: false
"#;

/// A complete nested configuration over RDMA.
pub const NESTED_YAML: &str = r#"local_hostname: worker01
contribute_to_cluster_pool_size: 8
protocal:
  type: ib
  rdma_device_name: mlx5_0
log_level: DEBUG
mooncake_spec:
  local_buffer_size: 1073741824
  metadata_server: "192.168.1.100:2379"
  master_server_address: "192.168.1.100:50051"
"#;

/// A configuration file in a temporary directory, deleted on drop.
pub struct TestConfigFile {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl TestConfigFile {
    /// Writes `contents` to a fresh temporary file.
    pub fn new(contents: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("kvcache.yaml");
        std::fs::write(&path, contents).expect("Failed to write config file");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    /// A file holding [`LEGACY_YAML`].
    pub fn legacy() -> Self {
        Self::new(LEGACY_YAML)
    }

    /// A file holding [`NESTED_YAML`].
    pub fn nested() -> Self {
        Self::new(NESTED_YAML)
    }

    /// A path in the same directory that does not exist yet.
    pub fn sibling(&self, name: &str) -> PathBuf {
        self._temp_dir.path().join(name)
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Small setup parameters suitable for a single-process engine.
pub fn test_params() -> SetupParams {
    SetupParams::new("test-host", "127.0.0.1:2379", 64 * 1024 * 1024, 16 * 1024 * 1024)
}

/// A registry whose Mooncake provider hands out clones of `engine`.
pub fn scripted_registry(engine: &ScriptedEngine) -> BackendRegistry {
    BackendRegistry::builtin().with_mooncake_loader(engine.loader())
}

/// A registry whose Mooncake provider hands out fresh scripted engines.
pub fn memory_registry() -> BackendRegistry {
    scripted_registry(&ScriptedEngine::new())
}

/// A Mooncake store over `engine`, already set up with [`test_params`].
pub fn ready_store(engine: &ScriptedEngine) -> MooncakeStore {
    let store = MooncakeStore::with_engine(engine.boxed());
    let code = store.setup(&test_params()).expect("Failed to set up store");
    assert_eq!(code, 0, "setup returned non-zero status");
    store
}

/// Runs a test with a Ready store that is closed afterwards.
///
/// # Example
///
/// ```rust
/// use kvcache_testkit::with_ready_store;
/// use kvcache_core::KvCacheStore;
///
/// with_ready_store(|store, _engine| {
///     store.put_value("k", b"v").unwrap();
///     assert!(store.is_exist("k").unwrap());
/// });
/// ```
pub fn with_ready_store<F, R>(f: F) -> R
where
    F: FnOnce(&MooncakeStore, &ScriptedEngine) -> R,
{
    let engine = ScriptedEngine::new();
    let store = ScopedStore::new(ready_store(&engine));
    f(&store, &engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvcache_core::{load_config, ConfigShape, KvCacheConfig, Protocol, GIB};

    #[test]
    fn sample_documents_parse() {
        let legacy = KvCacheConfig::from_yaml_str(LEGACY_YAML).unwrap();
        assert_eq!(legacy, KvCacheConfig::default());

        let nested = KvCacheConfig::from_yaml_str(NESTED_YAML).unwrap();
        assert_eq!(nested.global_segment_size(), 8 * GIB);
        assert_eq!(nested.protocol(), Protocol::Ib);
        assert_eq!(nested.device_name(), "mlx5_0");
    }

    #[test]
    fn config_files_are_readable() {
        let file = TestConfigFile::nested();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.local_hostname(), "worker01");

        let out = file.sibling("legacy.yaml");
        config.save_to_file(&out, ConfigShape::Legacy).unwrap();
        assert_eq!(load_config(&out).unwrap(), config);
    }

    #[test]
    fn ready_store_fixture() {
        let engine = ScriptedEngine::new();
        let store = ready_store(&engine);
        assert!(store.is_ready());
        assert_eq!(engine.operations(), vec!["setup"]);
    }

    #[test]
    fn scoped_fixture_closes() {
        let engine = with_ready_store(|_store, engine| engine.clone());
        assert_eq!(engine.operations().last(), Some(&"close"));
    }

    #[test]
    fn registries_with_scripted_engine() {
        let engine = ScriptedEngine::new();
        let registry = scripted_registry(&engine);
        let store = registry.create_store_with_auto_backend().unwrap();
        store.setup(&test_params()).unwrap();
        assert_eq!(engine.call_count(), 1);

        assert!(memory_registry().detect_best_backend().is_ok());
    }
}
