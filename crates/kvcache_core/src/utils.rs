//! Lifecycle helpers that drive `setup` from configuration.

use tracing::debug;

use crate::backends::BackendRegistry;
use crate::config::KvCacheConfig;
use crate::error::{KvCacheError, KvResult};
use crate::store::{KvCacheStore, SetupParams, STATUS_OK};

/// Sets `store` up and fails unless the engine reports success.
///
/// [`SetupParams::default`] gives the standard single-node parameters.
///
/// # Errors
///
/// Returns [`KvCacheError::StoreInitialization`] if setup returns a
/// non-zero status, or propagates the error from [`KvCacheStore::setup`].
pub fn get_client(store: &dyn KvCacheStore, params: &SetupParams) -> KvResult<()> {
    match store.setup(params)? {
        STATUS_OK => Ok(()),
        code => Err(KvCacheError::store_initialization(format!(
            "failed to setup store client. Return code: {code}"
        ))),
    }
}

/// Sets `store` up with the connection parameters of `config`.
///
/// # Errors
///
/// See [`get_client`].
pub fn get_client_with_config(store: &dyn KvCacheStore, config: &KvCacheConfig) -> KvResult<()> {
    debug!(backend = %store.backend_type(), %config, "setting up store from config");
    get_client(store, &SetupParams::from(config))
}

/// Constructs the store selected by `config` and sets it up.
///
/// The returned handle is Ready.
///
/// # Errors
///
/// Returns [`KvCacheError::BackendNotFound`] if the configured backend is not
/// available, otherwise see [`get_client`].
pub fn create_store_from_config(
    registry: &BackendRegistry,
    config: &KvCacheConfig,
) -> KvResult<Box<dyn KvCacheStore>> {
    let store = registry.create_store(config.backend_type())?;
    get_client_with_config(store.as_ref(), config)?;
    Ok(store)
}
