//! # KVCache Core
//!
//! Pluggable backend abstraction over distributed key-value caches.
//!
//! This crate provides the unified store contract, the backend registry and
//! the configuration model. It does not cache anything itself: every data
//! operation is delegated to the engine behind a backend.
//!
//! ## Design Principles
//!
//! - Stores are opaque byte caches keyed by strings
//! - No data operation before a successful `setup` or after `close`
//! - Engine failures are wrapped once, with operation and key context
//! - Native engines are reached only through [`NativeStore`]
//!
//! ## Available Backends
//!
//! - [`MooncakeStore`] - Adapter over a Mooncake distributed store session
//! - [`RustStore`] - Placeholder, never available
//!
//! ## Example
//!
//! ```rust
//! use kvcache_core::{
//!     BackendRegistry, FnLoader, InMemoryEngine, KvCacheConfig, KvCacheStore, NativeStore,
//! };
//!
//! let registry = BackendRegistry::builtin().with_mooncake_loader(FnLoader::new(|| {
//!     Ok(Box::new(InMemoryEngine::new()) as Box<dyn NativeStore>)
//! }));
//! let config = KvCacheConfig::default();
//! let store = kvcache_core::create_store_from_config(&registry, &config).unwrap();
//!
//! store.put("layer0", &[b"ab".as_slice(), b"cd".as_slice()]).unwrap();
//! assert_eq!(store.get("layer0").unwrap(), b"abcd");
//! assert_eq!(store.close().unwrap(), 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backends;
mod config;
mod engine;
mod error;
mod memory;
mod store;
mod utils;

pub use backends::{
    BackendProvider, BackendRegistry, BackendType, MooncakeProvider, MooncakeStore, RustProvider,
    RustStore,
};
pub use config::{
    create_default_config, load_config, ConfigShape, KvCacheConfig, KvCacheConfigBuilder,
    LogLevel, Protocol, DEFAULT_DEVICE_NAME, DEFAULT_GLOBAL_SEGMENT_SIZE,
    DEFAULT_LOCAL_BUFFER_SIZE, DEFAULT_LOCAL_HOSTNAME, DEFAULT_MASTER_SERVER_ADDRESS,
    DEFAULT_METADATA_SERVER, GIB, MAX_SIZE,
};
pub use engine::{
    EngineLoader, FnLoader, LoadError, NativeError, NativeResult, NativeStore, UnlinkedLoader,
};
pub use error::{KvCacheError, KvResult};
pub use memory::{InMemoryEngine, NOT_FOUND_CODE};
pub use store::{with_scoped_store, KvCacheStore, ScopedStore, SetupParams, StoreState, STATUS_OK};
pub use utils::{create_store_from_config, get_client, get_client_with_config};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
