//! Static registry mapping backend descriptors to store constructors.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::mooncake::MooncakeProvider;
use super::rust::RustProvider;
use super::BackendType;
use crate::engine::{EngineLoader, LoadError};
use crate::error::{KvCacheError, KvResult};
use crate::store::KvCacheStore;

/// Constructs store handles for one backend.
///
/// `probe` is the backend's availability predicate. It must not have side
/// effects beyond what loading the engine requires, since the registry may
/// call it any number of times.
pub trait BackendProvider: Send + Sync {
    /// The backend this provider constructs.
    fn backend_type(&self) -> BackendType;

    /// Checks whether the backend's native engine can be loaded.
    fn probe(&self) -> Result<(), LoadError>;

    /// Constructs a new NotReady store handle.
    fn create(&self) -> Result<Box<dyn KvCacheStore>, LoadError>;
}

/// The set of backends a process can construct.
///
/// # Example
///
/// ```rust
/// use kvcache_core::{BackendRegistry, BackendType, FnLoader, InMemoryEngine, NativeStore};
///
/// let registry = BackendRegistry::builtin().with_mooncake_loader(FnLoader::new(|| {
///     Ok(Box::new(InMemoryEngine::new()) as Box<dyn NativeStore>)
/// }));
/// assert_eq!(registry.detect_best_backend().unwrap(), BackendType::Mooncake);
/// let store = registry.create_store(BackendType::Mooncake).unwrap();
/// assert!(!store.is_ready());
/// ```
#[derive(Clone, Default)]
pub struct BackendRegistry {
    providers: BTreeMap<BackendType, Arc<dyn BackendProvider>>,
}

impl BackendRegistry {
    /// Creates a registry with no backends.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in backend.
    ///
    /// Mooncake is registered with an unlinked loader; plug a native binding
    /// in with [`BackendRegistry::with_mooncake_loader`].
    #[must_use]
    pub fn builtin() -> Self {
        Self::new()
            .with_provider(MooncakeProvider::unlinked())
            .with_provider(RustProvider)
    }

    /// Registers `provider`, replacing any provider for the same backend.
    pub fn register(&mut self, provider: impl BackendProvider + 'static) {
        self.providers
            .insert(provider.backend_type(), Arc::new(provider));
    }

    /// Builder-style [`BackendRegistry::register`].
    #[must_use]
    pub fn with_provider(mut self, provider: impl BackendProvider + 'static) -> Self {
        self.register(provider);
        self
    }

    /// Registers Mooncake with the given native loader.
    #[must_use]
    pub fn with_mooncake_loader(self, loader: impl EngineLoader + 'static) -> Self {
        self.with_provider(MooncakeProvider::new(loader))
    }

    /// Backends registered, whether or not they are available.
    pub fn registered_backends(&self) -> Vec<BackendType> {
        self.providers.keys().copied().collect()
    }

    /// Probes one backend.
    ///
    /// # Errors
    ///
    /// Returns [`KvCacheError::BackendNotFound`] if the backend is not
    /// registered or its engine cannot be loaded.
    pub fn probe(&self, backend: BackendType) -> KvResult<()> {
        let provider = self.provider(backend)?;
        provider
            .probe()
            .map_err(|e| KvCacheError::backend_not_found(backend.as_str(), e.to_string()))
    }

    /// Constructs a NotReady store for `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`KvCacheError::BackendNotFound`] if the backend is not
    /// registered or its engine cannot be loaded.
    pub fn create_store(&self, backend: BackendType) -> KvResult<Box<dyn KvCacheStore>> {
        let provider = self.provider(backend)?;
        let store = provider.create().map_err(|e| {
            KvCacheError::backend_not_found(
                backend.as_str(),
                format!("{backend} backend not available: {e}"),
            )
        })?;
        debug!(%backend, "created store");
        Ok(store)
    }

    /// Constructs a NotReady store for a backend given by name.
    ///
    /// # Errors
    ///
    /// Returns [`KvCacheError::BackendNotFound`] for unknown names, otherwise
    /// see [`BackendRegistry::create_store`].
    pub fn create_store_by_name(&self, name: &str) -> KvResult<Box<dyn KvCacheStore>> {
        self.create_store(name.parse()?)
    }

    /// Returns the backends whose engines load right now.
    pub fn list_available_backends(&self) -> BTreeSet<BackendType> {
        self.providers
            .iter()
            .filter_map(|(backend, provider)| match provider.probe() {
                Ok(()) => Some(*backend),
                Err(e) => {
                    debug!(%backend, reason = %e, "backend unavailable");
                    None
                }
            })
            .collect()
    }

    /// Picks the preferred available backend.
    ///
    /// Preference follows [`BackendType::PREFERENCE`], Mooncake first.
    ///
    /// # Errors
    ///
    /// Returns [`KvCacheError::NoBackendsAvailable`] if nothing loads.
    pub fn detect_best_backend(&self) -> KvResult<BackendType> {
        let available = self.list_available_backends();
        BackendType::PREFERENCE
            .into_iter()
            .find(|backend| available.contains(backend))
            .or_else(|| available.first().copied())
            .ok_or(KvCacheError::NoBackendsAvailable)
    }

    /// Constructs a store for the detected best backend.
    ///
    /// # Errors
    ///
    /// See [`BackendRegistry::detect_best_backend`] and
    /// [`BackendRegistry::create_store`].
    pub fn create_store_with_auto_backend(&self) -> KvResult<Box<dyn KvCacheStore>> {
        let backend = self.detect_best_backend()?;
        self.create_store(backend)
    }

    fn provider(&self, backend: BackendType) -> KvResult<&Arc<dyn BackendProvider>> {
        self.providers.get(&backend).ok_or_else(|| {
            KvCacheError::backend_not_found(backend.as_str(), "backend is not registered")
        })
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.registered_backends())
            .finish()
    }
}
