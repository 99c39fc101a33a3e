//! In-memory native engine for testing.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::engine::{NativeError, NativeResult, NativeStore};
use crate::store::SetupParams;

/// Status code returned by [`InMemoryEngine`] when removing an absent key.
pub const NOT_FOUND_CODE: i32 = -1;

/// A [`NativeStore`] that keeps every value in process memory.
///
/// This engine is suitable for:
/// - Unit and integration tests of adapters and utilities
/// - Ephemeral single-process caches that don't need a cluster
///
/// Values are stored as [`Bytes`], so `get_buffer` hands out views without
/// copying.
///
/// # Thread Safety
///
/// This engine is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use kvcache_core::{InMemoryEngine, NativeStore, SetupParams};
///
/// let engine = InMemoryEngine::new();
/// engine.setup(&SetupParams::new("h1", "127.0.0.1:2379", 1024, 1024)).unwrap();
/// assert_eq!(engine.put("k", b"v").unwrap(), 0);
/// assert_eq!(engine.get("k").unwrap(), b"v");
/// ```
#[derive(Debug)]
pub struct InMemoryEngine {
    data: RwLock<HashMap<String, Bytes>>,
    session: RwLock<Option<SetupParams>>,
    multipart: bool,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            session: RwLock::new(None),
            multipart: true,
        }
    }
}

impl InMemoryEngine {
    /// Creates a new empty engine with native multi-part writes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with pre-existing entries.
    #[must_use]
    pub fn with_data<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Bytes>,
    {
        let engine = Self::new();
        engine
            .data
            .write()
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        engine
    }

    /// Disables the native multi-part write primitive.
    #[must_use]
    pub fn without_put_parts(mut self) -> Self {
        self.multipart = false;
        self
    }

    /// Parameters of the current session, if set up.
    #[must_use]
    pub fn session(&self) -> Option<SetupParams> {
        self.session.read().clone()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Returns all keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl NativeStore for InMemoryEngine {
    fn setup(&self, params: &SetupParams) -> NativeResult<i32> {
        *self.session.write() = Some(params.clone());
        Ok(0)
    }

    fn put(&self, key: &str, value: &[u8]) -> NativeResult<i32> {
        self.data
            .write()
            .insert(key.to_string(), Bytes::copy_from_slice(value));
        Ok(0)
    }

    fn supports_put_parts(&self) -> bool {
        self.multipart
    }

    fn put_parts(&self, key: &str, parts: &[&[u8]]) -> NativeResult<i32> {
        if !self.multipart {
            return Err(NativeError::new("put_parts is not supported by this engine"));
        }
        let value: Vec<u8> = parts.concat();
        self.data.write().insert(key.to_string(), Bytes::from(value));
        Ok(0)
    }

    fn get(&self, key: &str) -> NativeResult<Vec<u8>> {
        Ok(self
            .data
            .read()
            .get(key)
            .map(|v| v.to_vec())
            .unwrap_or_default())
    }

    fn get_buffer(&self, key: &str) -> NativeResult<Option<Bytes>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn get_size(&self, key: &str) -> NativeResult<i64> {
        Ok(self
            .data
            .read()
            .get(key)
            .map_or(-1, |v| v.len() as i64))
    }

    fn is_exist(&self, key: &str) -> NativeResult<i32> {
        Ok(i32::from(self.data.read().contains_key(key)))
    }

    fn remove(&self, key: &str) -> NativeResult<i32> {
        match self.data.write().remove(key) {
            Some(_) => Ok(0),
            None => Ok(NOT_FOUND_CODE),
        }
    }

    fn close(&self) -> NativeResult<i32> {
        // Data outlives the session, like segments held by the cluster.
        *self.session.write() = None;
        Ok(0)
    }
}
