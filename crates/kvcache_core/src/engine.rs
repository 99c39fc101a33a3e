//! Boundary to the wrapped native store engine.
//!
//! The distributed engine (replication, transport, segment allocation) lives
//! outside this crate. Adapters reach it only through [`NativeStore`], and
//! obtain one through an [`EngineLoader`] at construction time.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::store::SetupParams;

/// A failure reported by the native engine.
///
/// Carries the engine's own message text, which adapters preserve when they
/// translate it into a [`crate::KvCacheError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NativeError {
    message: String,
}

impl NativeError {
    /// Creates a native error from the engine's message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the engine's message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type for native engine calls.
pub type NativeResult<T> = Result<T, NativeError>;

/// The native engine could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LoadError {
    message: String,
}

impl LoadError {
    /// Creates a load error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The synchronous call surface of a native store engine.
///
/// Integer returns follow the engine's conventions: `0` means success for
/// status codes, `get_size` is negative for absent keys, and `is_exist`
/// returns `0` or `1`.
///
/// Engines own their concurrency, so every method takes `&self`.
pub trait NativeStore: Send + Sync {
    /// Connects to the cluster and registers local memory.
    fn setup(&self, params: &SetupParams) -> NativeResult<i32>;

    /// Writes a single value.
    fn put(&self, key: &str, value: &[u8]) -> NativeResult<i32>;

    /// Whether [`NativeStore::put_parts`] is implemented.
    fn supports_put_parts(&self) -> bool {
        false
    }

    /// Writes one value assembled from several parts.
    fn put_parts(&self, key: &str, parts: &[&[u8]]) -> NativeResult<i32> {
        let _ = (key, parts);
        Err(NativeError::new("put_parts is not supported by this engine"))
    }

    /// Reads a value. Absent keys yield an empty vector.
    fn get(&self, key: &str) -> NativeResult<Vec<u8>>;

    /// Reads a value without copying, or `None` when absent.
    fn get_buffer(&self, key: &str) -> NativeResult<Option<Bytes>>;

    /// Size of a value in bytes, negative when absent.
    fn get_size(&self, key: &str) -> NativeResult<i64>;

    /// `1` if the key exists, `0` otherwise.
    fn is_exist(&self, key: &str) -> NativeResult<i32>;

    /// Deletes a key.
    fn remove(&self, key: &str) -> NativeResult<i32>;

    /// Tears down the session.
    fn close(&self) -> NativeResult<i32>;
}

impl fmt::Debug for dyn NativeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeStore {{ ... }}")
    }
}

/// Produces native engine sessions.
///
/// `probe` must be cheap and free of side effects: the registry calls it to
/// decide which backends are available.
pub trait EngineLoader: Send + Sync {
    /// Checks whether the engine can be loaded.
    fn probe(&self) -> Result<(), LoadError>;

    /// Loads a fresh engine session.
    fn load(&self) -> Result<Box<dyn NativeStore>, LoadError>;
}

/// Loader for an engine that is not linked into this build.
#[derive(Debug, Clone)]
pub struct UnlinkedLoader {
    engine: &'static str,
}

impl UnlinkedLoader {
    /// Creates a loader that always reports `engine` as missing.
    pub const fn new(engine: &'static str) -> Self {
        Self { engine }
    }

    fn missing(&self) -> LoadError {
        LoadError::new(format!(
            "{} native store is not linked into this build",
            self.engine
        ))
    }
}

impl EngineLoader for UnlinkedLoader {
    fn probe(&self) -> Result<(), LoadError> {
        Err(self.missing())
    }

    fn load(&self) -> Result<Box<dyn NativeStore>, LoadError> {
        Err(self.missing())
    }
}

/// Loader backed by a constructor function.
///
/// This is how an application plugs its native binding in:
///
/// ```rust
/// use kvcache_core::{FnLoader, InMemoryEngine, NativeStore};
///
/// let loader = FnLoader::new(|| Ok(Box::new(InMemoryEngine::new()) as Box<dyn NativeStore>));
/// ```
pub struct FnLoader {
    factory: Arc<dyn Fn() -> Result<Box<dyn NativeStore>, LoadError> + Send + Sync>,
}

impl FnLoader {
    /// Wraps a constructor function.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn NativeStore>, LoadError> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }
}

impl fmt::Debug for FnLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLoader").finish_non_exhaustive()
    }
}

impl EngineLoader for FnLoader {
    fn probe(&self) -> Result<(), LoadError> {
        // Constructing a session is the only way to know; it is dropped unused.
        (self.factory)().map(|_| ())
    }

    fn load(&self) -> Result<Box<dyn NativeStore>, LoadError> {
        (self.factory)()
    }
}
