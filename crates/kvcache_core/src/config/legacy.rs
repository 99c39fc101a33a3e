//! Legacy flat configuration shape.
//!
//! ```yaml
//! local_hostname: localhost
//! metadata_server: "127.0.0.1:2379"
//! global_segment_size: 3355443200
//! local_buffer_size: 536870912
//! protocol: tcp
//! device_name: lo
//! master_server_address: "127.0.0.1:50051"
//! backend: mooncake
//! log_level: INFO
//! enable_metrics: false
//! ```
//!
//! Every key is optional. Unknown keys are kept as passthrough values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::model::{
    KvCacheConfig, DEFAULT_DEVICE_NAME, DEFAULT_GLOBAL_SEGMENT_SIZE, DEFAULT_LOCAL_BUFFER_SIZE,
    DEFAULT_LOCAL_HOSTNAME, DEFAULT_MASTER_SERVER_ADDRESS, DEFAULT_METADATA_SERVER,
};
use super::types::{LogLevel, Protocol};
use super::{positive_size, signed_size};
use crate::backends::BackendType;
use crate::error::{KvCacheError, KvResult};

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct LegacyDocument {
    #[serde(default = "default_local_hostname")]
    local_hostname: String,
    #[serde(default = "default_metadata_server")]
    metadata_server: String,
    #[serde(default = "default_global_segment_size")]
    global_segment_size: i64,
    #[serde(default = "default_local_buffer_size")]
    local_buffer_size: i64,
    #[serde(default = "default_protocol")]
    protocol: String,
    #[serde(default)]
    device_name: Option<String>,
    #[serde(default = "default_master_server_address")]
    master_server_address: Option<String>,
    #[serde(default = "default_backend")]
    backend: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    enable_metrics: bool,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

fn default_local_hostname() -> String {
    DEFAULT_LOCAL_HOSTNAME.to_string()
}

fn default_metadata_server() -> String {
    DEFAULT_METADATA_SERVER.to_string()
}

fn default_global_segment_size() -> i64 {
    DEFAULT_GLOBAL_SEGMENT_SIZE as i64
}

fn default_local_buffer_size() -> i64 {
    DEFAULT_LOCAL_BUFFER_SIZE as i64
}

fn default_protocol() -> String {
    Protocol::Tcp.as_str().to_string()
}

fn default_master_server_address() -> Option<String> {
    Some(DEFAULT_MASTER_SERVER_ADDRESS.to_string())
}

fn default_backend() -> String {
    BackendType::Mooncake.as_str().to_string()
}

fn default_log_level() -> String {
    LogLevel::Info.as_str().to_string()
}

impl LegacyDocument {
    /// Decodes the flat shape from an already parsed YAML value.
    pub(crate) fn from_value(value: Value) -> KvResult<Self> {
        serde_yaml::from_value(value)
            .map_err(|e| KvCacheError::validation(format!("invalid legacy config: {e}")))
    }

    /// Normalizes into the canonical model, validating every field.
    pub(crate) fn into_config(self) -> KvResult<KvCacheConfig> {
        let protocol: Protocol = self.protocol.parse()?;
        let backend: BackendType = self.backend.parse().map_err(|_| {
            KvCacheError::validation(format!(
                "backend must be one of: mooncake, rust (got '{}')",
                self.backend
            ))
        })?;
        let log_level: LogLevel = self.log_level.parse()?;

        let device_name = match self.device_name {
            Some(name) => name,
            None if protocol.requires_device() => {
                return Err(KvCacheError::validation(
                    "device_name is required when protocol is 'ib'",
                ))
            }
            None => DEFAULT_DEVICE_NAME.to_string(),
        };

        let config = KvCacheConfig {
            local_hostname: self.local_hostname,
            metadata_server: self.metadata_server,
            global_segment_size: positive_size("global_segment_size", self.global_segment_size)?,
            local_buffer_size: positive_size("local_buffer_size", self.local_buffer_size)?,
            protocol,
            device_name,
            master_server_address: self.master_server_address,
            backend,
            log_level,
            enable_metrics: self.enable_metrics,
            extra: self.extra,
        };
        config.validate()?;
        Ok(config)
    }

    /// Projects the canonical model onto the flat shape.
    pub(crate) fn from_config(config: &KvCacheConfig) -> KvResult<Self> {
        Ok(Self {
            local_hostname: config.local_hostname.clone(),
            metadata_server: config.metadata_server.clone(),
            global_segment_size: signed_size("global_segment_size", config.global_segment_size)?,
            local_buffer_size: signed_size("local_buffer_size", config.local_buffer_size)?,
            protocol: config.protocol.as_str().to_string(),
            device_name: Some(config.device_name.clone()),
            master_server_address: config.master_server_address.clone(),
            backend: config.backend.as_str().to_string(),
            log_level: config.log_level.as_str().to_string(),
            enable_metrics: config.enable_metrics,
            extra: config.extra.clone(),
        })
    }
}
