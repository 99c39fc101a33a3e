//! Canonical configuration model shared by both YAML shapes.

use std::collections::BTreeMap;
use std::fmt;

use serde_yaml::Value;

use super::types::{LogLevel, Protocol};
use crate::backends::BackendType;
use crate::error::{KvCacheError, KvResult};

/// One gibibyte, the unit of `contribute_to_cluster_pool_size`.
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Default global segment size (3200 MiB).
pub const DEFAULT_GLOBAL_SEGMENT_SIZE: u64 = 3200 * 1024 * 1024;

/// Default local buffer size (512 MiB).
pub const DEFAULT_LOCAL_BUFFER_SIZE: u64 = 512 * 1024 * 1024;

/// Largest size either YAML shape can hold, since both store signed integers.
pub const MAX_SIZE: u64 = i64::MAX as u64;

/// Default local hostname.
pub const DEFAULT_LOCAL_HOSTNAME: &str = "localhost";

/// Default metadata server address.
pub const DEFAULT_METADATA_SERVER: &str = "127.0.0.1:2379";

/// Default master server address.
pub const DEFAULT_MASTER_SERVER_ADDRESS: &str = "127.0.0.1:50051";

/// Default network device.
pub const DEFAULT_DEVICE_NAME: &str = "lo";

/// Keys with a meaning in either shape. Passthrough keys may not reuse them.
pub(crate) const RESERVED_KEYS: &[&str] = &[
    "local_hostname",
    "metadata_server",
    "global_segment_size",
    "local_buffer_size",
    "protocol",
    "device_name",
    "master_server_address",
    "backend",
    "log_level",
    "enable_metrics",
    "contribute_to_cluster_pool_size",
    "protocal",
    "mooncake_spec",
];

/// Validated connection and runtime parameters for a KV cache store.
///
/// Both YAML shapes normalize into this type. Instances are immutable: they
/// are produced by the parsers in [`crate::config`] or by
/// [`KvCacheConfigBuilder::build`], all of which validate.
#[derive(Debug, Clone, PartialEq)]
pub struct KvCacheConfig {
    pub(crate) local_hostname: String,
    pub(crate) metadata_server: String,
    pub(crate) global_segment_size: u64,
    pub(crate) local_buffer_size: u64,
    pub(crate) protocol: Protocol,
    pub(crate) device_name: String,
    pub(crate) master_server_address: Option<String>,
    pub(crate) backend: BackendType,
    pub(crate) log_level: LogLevel,
    pub(crate) enable_metrics: bool,
    pub(crate) extra: BTreeMap<String, Value>,
}

impl Default for KvCacheConfig {
    fn default() -> Self {
        Self {
            local_hostname: DEFAULT_LOCAL_HOSTNAME.to_string(),
            metadata_server: DEFAULT_METADATA_SERVER.to_string(),
            global_segment_size: DEFAULT_GLOBAL_SEGMENT_SIZE,
            local_buffer_size: DEFAULT_LOCAL_BUFFER_SIZE,
            protocol: Protocol::Tcp,
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            master_server_address: Some(DEFAULT_MASTER_SERVER_ADDRESS.to_string()),
            backend: BackendType::Mooncake,
            log_level: LogLevel::Info,
            enable_metrics: false,
            extra: BTreeMap::new(),
        }
    }
}

impl KvCacheConfig {
    /// Starts a builder seeded with the default values.
    #[must_use]
    pub fn builder() -> KvCacheConfigBuilder {
        KvCacheConfigBuilder::default()
    }

    /// The local hostname announced to the cluster.
    pub fn local_hostname(&self) -> &str {
        &self.local_hostname
    }

    /// Address of the metadata server.
    pub fn metadata_server(&self) -> &str {
        &self.metadata_server
    }

    /// Bytes this node contributes to the global segment pool.
    pub fn global_segment_size(&self) -> u64 {
        self.global_segment_size
    }

    /// Bytes reserved for the local transfer buffer.
    pub fn local_buffer_size(&self) -> u64 {
        self.local_buffer_size
    }

    /// Transport protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Network (or RDMA) device name.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Address of the master server, if any.
    pub fn master_server_address(&self) -> Option<&str> {
        self.master_server_address.as_deref()
    }

    /// Backend selector.
    pub fn backend_type(&self) -> BackendType {
        self.backend
    }

    /// Configured log level.
    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Whether metrics collection was requested.
    pub fn enable_metrics(&self) -> bool {
        self.enable_metrics
    }

    /// Unknown keys retained verbatim from the source document.
    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    /// Returns a passthrough value by key.
    pub fn get_extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Checks the invariants every configuration must satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`KvCacheError::Validation`] if a size is zero or above
    /// [`MAX_SIZE`], the device name is blank, or a passthrough key shadows
    /// a field.
    pub fn validate(&self) -> KvResult<()> {
        if self.global_segment_size == 0 {
            return Err(KvCacheError::validation("global_segment_size must be positive"));
        }
        if self.local_buffer_size == 0 {
            return Err(KvCacheError::validation("local_buffer_size must be positive"));
        }
        for (field, size) in [
            ("global_segment_size", self.global_segment_size),
            ("local_buffer_size", self.local_buffer_size),
        ] {
            if size > MAX_SIZE {
                return Err(KvCacheError::validation(format!(
                    "{field} must not exceed {MAX_SIZE} bytes"
                )));
            }
        }
        if self.device_name.trim().is_empty() {
            let message = if self.protocol.requires_device() {
                "rdma_device_name is required when protocol type is 'ib'"
            } else {
                "device_name must not be empty"
            };
            return Err(KvCacheError::validation(message));
        }
        if let Some(key) = self.extra.keys().find(|k| RESERVED_KEYS.contains(&k.as_str())) {
            return Err(KvCacheError::validation(format!(
                "key '{key}' names a configuration field and cannot be a passthrough value"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for KvCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KvCacheConfig(backend={}, host={}, metadata={})",
            self.backend, self.local_hostname, self.metadata_server
        )
    }
}

/// Builder for programmatic construction of a [`KvCacheConfig`].
#[derive(Debug, Clone, Default)]
pub struct KvCacheConfigBuilder {
    config: KvCacheConfig,
}

impl KvCacheConfigBuilder {
    /// Sets the local hostname.
    #[must_use]
    pub fn local_hostname(mut self, value: impl Into<String>) -> Self {
        self.config.local_hostname = value.into();
        self
    }

    /// Sets the metadata server address.
    #[must_use]
    pub fn metadata_server(mut self, value: impl Into<String>) -> Self {
        self.config.metadata_server = value.into();
        self
    }

    /// Sets the global segment size in bytes.
    #[must_use]
    pub fn global_segment_size(mut self, bytes: u64) -> Self {
        self.config.global_segment_size = bytes;
        self
    }

    /// Sets the local buffer size in bytes.
    #[must_use]
    pub fn local_buffer_size(mut self, bytes: u64) -> Self {
        self.config.local_buffer_size = bytes;
        self
    }

    /// Sets the transport protocol.
    #[must_use]
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.config.protocol = protocol;
        self
    }

    /// Sets the device name.
    #[must_use]
    pub fn device_name(mut self, value: impl Into<String>) -> Self {
        self.config.device_name = value.into();
        self
    }

    /// Sets or clears the master server address.
    #[must_use]
    pub fn master_server_address(mut self, value: Option<String>) -> Self {
        self.config.master_server_address = value;
        self
    }

    /// Sets the backend selector.
    #[must_use]
    pub fn backend(mut self, backend: BackendType) -> Self {
        self.config.backend = backend;
        self
    }

    /// Sets the log level.
    #[must_use]
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    /// Enables or disables metrics collection.
    #[must_use]
    pub fn enable_metrics(mut self, value: bool) -> Self {
        self.config.enable_metrics = value;
        self
    }

    /// Adds a passthrough key.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.extra.insert(key.into(), value);
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// See [`KvCacheConfig::validate`].
    pub fn build(self) -> KvResult<KvCacheConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
