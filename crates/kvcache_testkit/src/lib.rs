//! # KVCache Testkit
//!
//! Test utilities for the KV cache layer.
//!
//! This crate provides:
//! - Sample configuration documents and temporary config files
//! - A scripted native engine with call recording and failure injection
//! - Property-based test generators using proptest
//! - A store harness that verifies reads against tracked writes
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust
//! use kvcache_core::KvCacheStore;
//! use kvcache_testkit::prelude::*;
//!
//! let engine = ScriptedEngine::new();
//! let store = ready_store(&engine);
//! store.put_value("k", b"v").unwrap();
//! assert_eq!(engine.operations(), vec!["setup", "put"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod fixtures;
pub mod generators;
pub mod harness;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::engine::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::harness::*;
    pub use crate::stress::*;
}

pub use engine::*;
pub use fixtures::*;
pub use generators::*;
pub use harness::*;
pub use stress::*;
