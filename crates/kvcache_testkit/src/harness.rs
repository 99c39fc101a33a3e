//! Store test harness.
//!
//! Tracks what a test wrote so reads can be verified against it.

use std::collections::HashMap;

use kvcache_core::KvCacheStore;

/// Wraps a Ready store and remembers the expected value of every key.
pub struct StoreHarness<S: KvCacheStore> {
    /// The store under test.
    pub store: S,
    expected: HashMap<String, Vec<u8>>,
}

impl<S: KvCacheStore> StoreHarness<S> {
    /// Wraps a store that is already Ready.
    pub fn new(store: S) -> Self {
        assert!(store.is_ready(), "harness requires a Ready store");
        Self {
            store,
            expected: HashMap::new(),
        }
    }

    /// Writes `parts` under `key` and tracks their concatenation.
    pub fn put(&mut self, key: &str, parts: &[&[u8]]) {
        let code = self.store.put(key, parts).expect("Failed to put");
        assert_eq!(code, 0, "put of '{key}' returned non-zero status");
        self.expected.insert(key.to_string(), parts.concat());
    }

    /// Reads `key` and checks it against the tracked value.
    pub fn get_and_verify(&self, key: &str) -> Option<Vec<u8>> {
        let actual = self.store.get_buffer(key).expect("Failed to get");
        let actual = actual.map(|b| b.to_vec());

        if let Some(expected) = self.expected.get(key) {
            assert_eq!(actual.as_ref(), Some(expected), "value mismatch for '{key}'");
            let size = self.store.get_size(key).expect("Failed to get size");
            assert_eq!(size, expected.len() as i64, "size mismatch for '{key}'");
        }
        actual
    }

    /// Removes `key` and stops tracking it.
    pub fn remove(&mut self, key: &str) {
        self.store.remove(key).expect("Failed to remove");
        self.expected.remove(key);
        assert!(
            !self.store.is_exist(key).expect("Failed to check existence"),
            "'{key}' still exists after remove"
        );
    }

    /// Verifies every tracked key.
    pub fn verify_all(&self) {
        for key in self.expected.keys() {
            self.get_and_verify(key);
        }
    }

    /// Number of tracked keys.
    pub fn tracked_count(&self) -> usize {
        self.expected.len()
    }

    /// Closes the store and returns it.
    pub fn close(self) -> S {
        let code = self.store.close().expect("Failed to close");
        assert_eq!(code, 0, "close returned non-zero status");
        self.store
    }
}
