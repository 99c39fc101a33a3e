//! Scripted native engine.
//!
//! [`ScriptedEngine`] behaves like the in-memory engine but records every
//! call and can be told to fail or return a chosen status per operation.
//! Clones share state, so a test can keep one clone for inspection after
//! handing another to a store.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use kvcache_core::{
    FnLoader, InMemoryEngine, NativeError, NativeResult, NativeStore, SetupParams,
};
use parking_lot::Mutex;

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    /// `setup` with the given hostname.
    Setup {
        /// Local hostname passed.
        local_hostname: String,
    },
    /// Single-value `put`.
    Put {
        /// Key written.
        key: String,
        /// Length of the value written.
        len: usize,
    },
    /// Multi-part `put_parts`.
    PutParts {
        /// Key written.
        key: String,
        /// Number of parts.
        parts: usize,
    },
    /// `get`.
    Get {
        /// Key read.
        key: String,
    },
    /// `get_buffer`.
    GetBuffer {
        /// Key read.
        key: String,
    },
    /// `get_size`.
    GetSize {
        /// Key queried.
        key: String,
    },
    /// `is_exist`.
    IsExist {
        /// Key queried.
        key: String,
    },
    /// `remove`.
    Remove {
        /// Key removed.
        key: String,
    },
    /// `close`.
    Close,
}

impl EngineCall {
    /// The operation name, as accepted by [`ScriptedEngine::fail_on`].
    pub fn operation(&self) -> &'static str {
        match self {
            EngineCall::Setup { .. } => "setup",
            EngineCall::Put { .. } => "put",
            EngineCall::PutParts { .. } => "put_parts",
            EngineCall::Get { .. } => "get",
            EngineCall::GetBuffer { .. } => "get_buffer",
            EngineCall::GetSize { .. } => "get_size",
            EngineCall::IsExist { .. } => "is_exist",
            EngineCall::Remove { .. } => "remove",
            EngineCall::Close => "close",
        }
    }
}

#[derive(Debug, Clone)]
enum Fault {
    Error(String),
    Status(i32),
}

#[derive(Debug, Default)]
struct Shared {
    data: InMemoryEngine,
    calls: Mutex<Vec<EngineCall>>,
    faults: Mutex<HashMap<String, Fault>>,
}

/// A recording, fault-injecting [`NativeStore`].
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    shared: Arc<Shared>,
    multipart: bool,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self {
            shared: Arc::default(),
            multipart: true,
        }
    }
}

impl ScriptedEngine {
    /// Creates an empty engine with multi-part writes enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine holding `entries`.
    pub fn with_data<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Bytes>,
    {
        Self {
            shared: Arc::new(Shared {
                data: InMemoryEngine::with_data(entries),
                ..Shared::default()
            }),
            multipart: true,
        }
    }

    /// Stops advertising the multi-part write primitive.
    #[must_use]
    pub fn without_put_parts(mut self) -> Self {
        self.multipart = false;
        self
    }

    /// Makes `operation` fail with `message` until cleared.
    pub fn fail_on(&self, operation: &str, message: impl Into<String>) {
        self.shared
            .faults
            .lock()
            .insert(operation.to_string(), Fault::Error(message.into()));
    }

    /// Makes `operation` return `code` without touching data, until cleared.
    ///
    /// Only applies to calls that return a status: `setup`, `put`,
    /// `put_parts`, `get_size`, `is_exist`, `remove` and `close`.
    pub fn return_status(&self, operation: &str, code: i32) {
        self.shared
            .faults
            .lock()
            .insert(operation.to_string(), Fault::Status(code));
    }

    /// Removes every injected failure.
    pub fn clear_faults(&self) {
        self.shared.faults.lock().clear();
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.shared.calls.lock().clone()
    }

    /// Operation names of every call so far, in order.
    pub fn operations(&self) -> Vec<&'static str> {
        self.shared.calls.lock().iter().map(EngineCall::operation).collect()
    }

    /// Number of calls so far.
    pub fn call_count(&self) -> usize {
        self.shared.calls.lock().len()
    }

    /// Forgets recorded calls.
    pub fn reset_calls(&self) {
        self.shared.calls.lock().clear();
    }

    /// The backing data, for assertions that bypass the call log.
    pub fn data(&self) -> &InMemoryEngine {
        &self.shared.data
    }

    /// A boxed clone sharing this engine's state.
    pub fn boxed(&self) -> Box<dyn NativeStore> {
        Box::new(self.clone())
    }

    /// A loader that hands out clones sharing this engine's state.
    pub fn loader(&self) -> FnLoader {
        let engine = self.clone();
        FnLoader::new(move || Ok(engine.boxed()))
    }

    fn record(&self, call: EngineCall) -> NativeResult<Option<i32>> {
        let operation = call.operation();
        self.shared.calls.lock().push(call);
        match self.shared.faults.lock().get(operation) {
            Some(Fault::Error(message)) => Err(NativeError::new(message.clone())),
            Some(Fault::Status(code)) => Ok(Some(*code)),
            None => Ok(None),
        }
    }
}

impl NativeStore for ScriptedEngine {
    fn setup(&self, params: &SetupParams) -> NativeResult<i32> {
        let call = EngineCall::Setup {
            local_hostname: params.local_hostname().to_string(),
        };
        match self.record(call)? {
            Some(code) => Ok(code),
            None => self.shared.data.setup(params),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> NativeResult<i32> {
        let call = EngineCall::Put {
            key: key.to_string(),
            len: value.len(),
        };
        match self.record(call)? {
            Some(code) => Ok(code),
            None => self.shared.data.put(key, value),
        }
    }

    fn supports_put_parts(&self) -> bool {
        self.multipart
    }

    fn put_parts(&self, key: &str, parts: &[&[u8]]) -> NativeResult<i32> {
        let call = EngineCall::PutParts {
            key: key.to_string(),
            parts: parts.len(),
        };
        match self.record(call)? {
            Some(code) => Ok(code),
            None if self.multipart => self.shared.data.put_parts(key, parts),
            None => Err(NativeError::new("put_parts is not supported by this engine")),
        }
    }

    fn get(&self, key: &str) -> NativeResult<Vec<u8>> {
        self.record(EngineCall::Get {
            key: key.to_string(),
        })?;
        self.shared.data.get(key)
    }

    fn get_buffer(&self, key: &str) -> NativeResult<Option<Bytes>> {
        self.record(EngineCall::GetBuffer {
            key: key.to_string(),
        })?;
        self.shared.data.get_buffer(key)
    }

    fn get_size(&self, key: &str) -> NativeResult<i64> {
        let call = EngineCall::GetSize {
            key: key.to_string(),
        };
        match self.record(call)? {
            Some(code) => Ok(i64::from(code)),
            None => self.shared.data.get_size(key),
        }
    }

    fn is_exist(&self, key: &str) -> NativeResult<i32> {
        let call = EngineCall::IsExist {
            key: key.to_string(),
        };
        match self.record(call)? {
            Some(code) => Ok(code),
            None => self.shared.data.is_exist(key),
        }
    }

    fn remove(&self, key: &str) -> NativeResult<i32> {
        let call = EngineCall::Remove {
            key: key.to_string(),
        };
        match self.record(call)? {
            Some(code) => Ok(code),
            None => self.shared.data.remove(key),
        }
    }

    fn close(&self) -> NativeResult<i32> {
        match self.record(EngineCall::Close)? {
            Some(code) => Ok(code),
            None => self.shared.data.close(),
        }
    }
}
