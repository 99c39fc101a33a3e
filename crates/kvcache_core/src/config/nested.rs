//! Current nested configuration shape.
//!
//! ```yaml
//! local_hostname: worker01
//! contribute_to_cluster_pool_size: 8
//! protocal:
//!   type: ib
//!   rdma_device_name: mlx5_0
//! log_level: DEBUG
//! mooncake_spec:
//!   local_buffer_size: 1073741824
//!   metadata_server: "192.168.1.100:2379"
//!   master_server_address: "192.168.1.100:50051"
//! ```
//!
//! The protocol group is written under `protocal`, the key deployed configs
//! use; `protocol` is accepted on input. `contribute_to_cluster_pool_size`
//! is expressed in GiB. The device name comes from `rdma_device_name`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::model::{KvCacheConfig, DEFAULT_DEVICE_NAME, GIB};
use super::{positive_size, signed_size};
use super::types::{LogLevel, Protocol};
use crate::backends::BackendType;
use crate::error::{KvCacheError, KvResult};

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct NestedDocument {
    local_hostname: String,
    contribute_to_cluster_pool_size: i64,
    #[serde(rename = "protocal", alias = "protocol")]
    protocol: ProtocolGroup,
    log_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backend: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    enable_metrics: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mooncake_spec: Option<MooncakeSpecGroup>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProtocolGroup {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rdma_device_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MooncakeSpecGroup {
    local_buffer_size: i64,
    metadata_server: String,
    #[serde(default)]
    master_server_address: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn nested_protocol(kind: &str) -> KvResult<Protocol> {
    match kind.to_ascii_lowercase().as_str() {
        "tcp" => Ok(Protocol::Tcp),
        "rdma" | "ib" => Ok(Protocol::Ib),
        _ => Err(KvCacheError::validation(format!(
            "protocol type must be one of: tcp, rdma, ib (got '{kind}')"
        ))),
    }
}

/// Where a flat-layout key lives in the nested layout.
fn nested_location(key: &str) -> Option<&'static str> {
    match key {
        "device_name" => Some("protocal.rdma_device_name"),
        "metadata_server" => Some("mooncake_spec.metadata_server"),
        "local_buffer_size" => Some("mooncake_spec.local_buffer_size"),
        "master_server_address" => Some("mooncake_spec.master_server_address"),
        "global_segment_size" => Some("contribute_to_cluster_pool_size (GiB)"),
        _ => None,
    }
}

impl NestedDocument {
    /// Decodes the nested shape from an already parsed YAML value.
    pub(crate) fn from_value(value: Value) -> KvResult<Self> {
        serde_yaml::from_value(value)
            .map_err(|e| KvCacheError::validation(format!("invalid nested config: {e}")))
    }

    /// Normalizes into the canonical model, validating every field.
    pub(crate) fn into_config(self) -> KvResult<KvCacheConfig> {
        if let Some((key, location)) = self
            .extra
            .keys()
            .find_map(|key| nested_location(key).map(|location| (key, location)))
        {
            return Err(KvCacheError::validation(format!(
                "key '{key}' is not part of the nested layout; use {location}"
            )));
        }

        let log_level: LogLevel = self.log_level.parse()?;
        let protocol = nested_protocol(&self.protocol.kind)?;

        let device_name = match self.protocol.rdma_device_name.filter(|d| !d.is_empty()) {
            Some(name) => name,
            None if protocol.requires_device() => {
                return Err(KvCacheError::validation(
                    "rdma_device_name is required when protocol type is 'ib'",
                ))
            }
            None => DEFAULT_DEVICE_NAME.to_string(),
        };

        let pool_gib = positive_size(
            "contribute_to_cluster_pool_size",
            self.contribute_to_cluster_pool_size,
        )?;
        let global_segment_size = pool_gib.checked_mul(GIB).ok_or_else(|| {
            KvCacheError::validation("contribute_to_cluster_pool_size is too large")
        })?;

        let backend = match self.backend {
            Some(name) => name.parse::<BackendType>().map_err(|_| {
                KvCacheError::validation(format!(
                    "backend must be one of: mooncake, rust (got '{name}')"
                ))
            })?,
            None => BackendType::Mooncake,
        };

        let spec = self.mooncake_spec.ok_or_else(|| {
            KvCacheError::validation("at least one of the following is required: [mooncake_spec]")
        })?;

        let config = KvCacheConfig {
            local_hostname: self.local_hostname,
            metadata_server: spec.metadata_server,
            global_segment_size,
            local_buffer_size: positive_size("local_buffer_size", spec.local_buffer_size)?,
            protocol,
            device_name,
            master_server_address: spec.master_server_address,
            backend,
            log_level,
            enable_metrics: self.enable_metrics,
            extra: self.extra,
        };
        config.validate()?;
        Ok(config)
    }

    /// Projects the canonical model onto the nested shape.
    ///
    /// # Errors
    ///
    /// Fails when the model holds values the nested shape cannot express:
    /// the UDP protocol, or a segment size that is not a whole number of GiB.
    pub(crate) fn from_config(config: &KvCacheConfig) -> KvResult<Self> {
        let kind = match config.protocol {
            Protocol::Tcp => "tcp",
            Protocol::Ib => "ib",
            Protocol::Udp => {
                return Err(KvCacheError::validation(
                    "protocol 'udp' cannot be expressed in the nested config shape",
                ))
            }
        };
        if config.global_segment_size % GIB != 0 {
            return Err(KvCacheError::validation(format!(
                "global_segment_size {} is not a whole number of GiB",
                config.global_segment_size
            )));
        }

        let rdma_device_name = (config.protocol.requires_device()
            || config.device_name != DEFAULT_DEVICE_NAME)
            .then(|| config.device_name.clone());

        Ok(Self {
            local_hostname: config.local_hostname.clone(),
            contribute_to_cluster_pool_size: signed_size(
                "global_segment_size",
                config.global_segment_size / GIB,
            )?,
            protocol: ProtocolGroup {
                kind: kind.to_string(),
                rdma_device_name,
            },
            log_level: config.log_level.as_str().to_string(),
            backend: (config.backend != BackendType::Mooncake)
                .then(|| config.backend.as_str().to_string()),
            enable_metrics: config.enable_metrics,
            mooncake_spec: Some(MooncakeSpecGroup {
                local_buffer_size: signed_size("local_buffer_size", config.local_buffer_size)?,
                metadata_server: config.metadata_server.clone(),
                master_server_address: config.master_server_address.clone(),
            }),
            extra: config.extra.clone(),
        })
    }
}
