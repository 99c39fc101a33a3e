//! The store contract every backend implements.

use std::fmt;
use std::ops::Deref;

use bytes::Bytes;
use tracing::warn;

use crate::backends::BackendType;
use crate::config::{KvCacheConfig, Protocol, DEFAULT_DEVICE_NAME};
use crate::error::{KvCacheError, KvResult};

/// Status code for a successful engine call.
pub const STATUS_OK: i32 = 0;

/// Lifecycle state of a store handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreState {
    /// Not set up, or closed. Data operations are rejected.
    #[default]
    NotReady,
    /// Set up successfully. Data operations are permitted.
    Ready,
}

impl StoreState {
    /// Returns true if data operations are permitted.
    pub fn is_ready(&self) -> bool {
        matches!(self, StoreState::Ready)
    }
}

/// Arguments for [`KvCacheStore::setup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupParams {
    local_hostname: String,
    metadata_server: String,
    global_segment_size: u64,
    local_buffer_size: u64,
    protocol: Protocol,
    device_name: String,
    master_server_address: Option<String>,
}

impl SetupParams {
    /// Creates setup parameters with protocol `tcp`, device `lo` and no
    /// master server.
    pub fn new(
        local_hostname: impl Into<String>,
        metadata_server: impl Into<String>,
        global_segment_size: u64,
        local_buffer_size: u64,
    ) -> Self {
        Self {
            local_hostname: local_hostname.into(),
            metadata_server: metadata_server.into(),
            global_segment_size,
            local_buffer_size,
            protocol: Protocol::Tcp,
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            master_server_address: None,
        }
    }

    /// Sets the transport protocol.
    #[must_use]
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Sets the device name.
    #[must_use]
    pub fn with_device_name(mut self, device_name: impl Into<String>) -> Self {
        self.device_name = device_name.into();
        self
    }

    /// Sets or clears the master server address.
    #[must_use]
    pub fn with_master_server_address(mut self, address: Option<String>) -> Self {
        self.master_server_address = address;
        self
    }

    /// The local hostname.
    pub fn local_hostname(&self) -> &str {
        &self.local_hostname
    }

    /// The metadata server address.
    pub fn metadata_server(&self) -> &str {
        &self.metadata_server
    }

    /// Global segment size in bytes.
    pub fn global_segment_size(&self) -> u64 {
        self.global_segment_size
    }

    /// Local buffer size in bytes.
    pub fn local_buffer_size(&self) -> u64 {
        self.local_buffer_size
    }

    /// Transport protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Device name.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Master server address, if any.
    pub fn master_server_address(&self) -> Option<&str> {
        self.master_server_address.as_deref()
    }

    /// Checks that sizes are positive.
    ///
    /// # Errors
    ///
    /// Returns [`KvCacheError::Validation`] naming the offending size.
    pub fn validate(&self) -> KvResult<()> {
        if self.global_segment_size == 0 {
            return Err(KvCacheError::validation("global_segment_size must be positive"));
        }
        if self.local_buffer_size == 0 {
            return Err(KvCacheError::validation("local_buffer_size must be positive"));
        }
        Ok(())
    }
}

impl Default for SetupParams {
    /// Parameters of [`KvCacheConfig::default`].
    fn default() -> Self {
        Self::from(&KvCacheConfig::default())
    }
}

impl From<&KvCacheConfig> for SetupParams {
    fn from(config: &KvCacheConfig) -> Self {
        Self::new(
            config.local_hostname(),
            config.metadata_server(),
            config.global_segment_size(),
            config.local_buffer_size(),
        )
        .with_protocol(config.protocol())
        .with_device_name(config.device_name())
        .with_master_server_address(config.master_server_address().map(str::to_string))
    }
}

/// A distributed KV cache store.
///
/// Handles start [`StoreState::NotReady`]. A successful [`setup`] makes them
/// Ready; [`close`] makes them NotReady again. Every data operation on a
/// NotReady handle fails with [`KvCacheError::NotInitialized`] before
/// reaching the engine.
///
/// Status-code returns (`setup`, `put`, `remove`, `close`) pass the engine's
/// code through: `0` is success.
///
/// [`setup`]: KvCacheStore::setup
/// [`close`]: KvCacheStore::close
pub trait KvCacheStore: Send + Sync {
    /// Which backend this handle belongs to.
    fn backend_type(&self) -> BackendType;

    /// Current lifecycle state.
    fn state(&self) -> StoreState;

    /// Returns true if data operations are permitted.
    fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Connects the store.
    ///
    /// # Errors
    ///
    /// - [`KvCacheError::Validation`] for non-positive sizes
    /// - [`KvCacheError::InvalidOperation`] if already Ready
    /// - [`KvCacheError::StoreInitialization`] if the engine fails
    fn setup(&self, params: &SetupParams) -> KvResult<i32>;

    /// Stores a value assembled from one or more parts.
    ///
    /// # Errors
    ///
    /// - [`KvCacheError::NotInitialized`] before setup
    /// - [`KvCacheError::Validation`] if `parts` is empty
    /// - [`KvCacheError::Storage`] if the engine fails
    fn put(&self, key: &str, parts: &[&[u8]]) -> KvResult<i32>;

    /// Stores a single value.
    ///
    /// # Errors
    ///
    /// See [`KvCacheStore::put`].
    fn put_value(&self, key: &str, value: &[u8]) -> KvResult<i32> {
        self.put(key, &[value])
    }

    /// Reads a value. An absent key yields an empty vector.
    ///
    /// Use [`KvCacheStore::get_buffer`] to tell an absent key from an empty
    /// value.
    ///
    /// # Errors
    ///
    /// [`KvCacheError::NotInitialized`] or [`KvCacheError::Storage`].
    fn get(&self, key: &str) -> KvResult<Vec<u8>>;

    /// Reads a value as a zero-copy buffer, `None` when absent.
    ///
    /// # Errors
    ///
    /// [`KvCacheError::NotInitialized`] or [`KvCacheError::Storage`].
    fn get_buffer(&self, key: &str) -> KvResult<Option<Bytes>>;

    /// Size of a value in bytes, negative when absent.
    ///
    /// # Errors
    ///
    /// [`KvCacheError::NotInitialized`] or [`KvCacheError::Storage`].
    fn get_size(&self, key: &str) -> KvResult<i64>;

    /// Whether a key exists.
    ///
    /// # Errors
    ///
    /// [`KvCacheError::NotInitialized`] or [`KvCacheError::Storage`].
    fn is_exist(&self, key: &str) -> KvResult<bool>;

    /// Deletes a key.
    ///
    /// # Errors
    ///
    /// [`KvCacheError::NotInitialized`] or [`KvCacheError::Storage`].
    fn remove(&self, key: &str) -> KvResult<i32>;

    /// Tears the store down. Returns `Ok(0)` without side effects when the
    /// handle is already NotReady.
    ///
    /// # Errors
    ///
    /// [`KvCacheError::Storage`] if the engine fails.
    fn close(&self) -> KvResult<i32>;
}

impl fmt::Debug for dyn KvCacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvCacheStore")
            .field("backend", &self.backend_type())
            .field("state", &self.state())
            .finish()
    }
}

impl<T: KvCacheStore + ?Sized> KvCacheStore for Box<T> {
    fn backend_type(&self) -> BackendType {
        (**self).backend_type()
    }

    fn state(&self) -> StoreState {
        (**self).state()
    }

    fn setup(&self, params: &SetupParams) -> KvResult<i32> {
        (**self).setup(params)
    }

    fn put(&self, key: &str, parts: &[&[u8]]) -> KvResult<i32> {
        (**self).put(key, parts)
    }

    fn get(&self, key: &str) -> KvResult<Vec<u8>> {
        (**self).get(key)
    }

    fn get_buffer(&self, key: &str) -> KvResult<Option<Bytes>> {
        (**self).get_buffer(key)
    }

    fn get_size(&self, key: &str) -> KvResult<i64> {
        (**self).get_size(key)
    }

    fn is_exist(&self, key: &str) -> KvResult<bool> {
        (**self).is_exist(key)
    }

    fn remove(&self, key: &str) -> KvResult<i32> {
        (**self).remove(key)
    }

    fn close(&self) -> KvResult<i32> {
        (**self).close()
    }
}

/// Closes the wrapped store when dropped.
///
/// Covers every exit path, including early returns through `?` and
/// unwinding. Prefer [`ScopedStore::finish`] on the normal path so that a
/// close failure is reported instead of only logged.
pub struct ScopedStore<S: KvCacheStore> {
    store: S,
    finished: bool,
}

impl<S: KvCacheStore> ScopedStore<S> {
    /// Takes ownership of `store` for the scope.
    pub fn new(store: S) -> Self {
        Self {
            store,
            finished: false,
        }
    }

    /// Closes the store now and reports the outcome.
    ///
    /// # Errors
    ///
    /// Propagates the error from [`KvCacheStore::close`].
    pub fn finish(mut self) -> KvResult<i32> {
        self.finished = true;
        self.store.close()
    }
}

impl<S: KvCacheStore> Deref for ScopedStore<S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl<S: KvCacheStore> fmt::Debug for ScopedStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedStore")
            .field("backend", &self.store.backend_type())
            .field("state", &self.store.state())
            .finish()
    }
}

impl<S: KvCacheStore> Drop for ScopedStore<S> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let backend = self.store.backend_type();
        match self.store.close() {
            Ok(STATUS_OK) => {}
            Ok(code) => warn!(%backend, code, "close on scope exit returned non-zero status"),
            Err(e) => warn!(%backend, error = %e, "close on scope exit failed"),
        }
    }
}

/// Runs `f` with `store` and closes it afterwards, on every exit path.
///
/// The closure's error takes precedence. Otherwise a failing close, or a
/// close that returns a non-zero status, is reported as an error.
///
/// # Errors
///
/// The error of `f`, or a [`KvCacheError::Storage`] from closing.
pub fn with_scoped_store<S, T, F>(store: S, f: F) -> KvResult<T>
where
    S: KvCacheStore,
    F: FnOnce(&S) -> KvResult<T>,
{
    let scoped = ScopedStore::new(store);
    let result = f(&scoped);
    let closed = scoped.finish();

    let value = result?;
    match closed? {
        STATUS_OK => Ok(value),
        code => Err(KvCacheError::storage_unkeyed(
            "close",
            format!("engine returned status {code}"),
        )),
    }
}
