//! Store configuration.
//!
//! Two YAML shapes are accepted and normalized into one [`KvCacheConfig`]:
//!
//! - the legacy flat shape (see [`ConfigShape::Legacy`]);
//! - the current nested shape with `protocal` and `mooncake_spec` groups
//!   (see [`ConfigShape::Nested`]).
//!
//! Parsing always validates. Serializing writes either shape and re-attaches
//! passthrough keys.

mod legacy;
mod model;
mod nested;
mod types;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde_yaml::Value;
use tracing::debug;

use crate::error::{KvCacheError, KvResult};
use legacy::LegacyDocument;
use nested::NestedDocument;

pub use model::{
    KvCacheConfig, KvCacheConfigBuilder, DEFAULT_DEVICE_NAME, DEFAULT_GLOBAL_SEGMENT_SIZE,
    DEFAULT_LOCAL_BUFFER_SIZE, DEFAULT_LOCAL_HOSTNAME, DEFAULT_MASTER_SERVER_ADDRESS,
    DEFAULT_METADATA_SERVER, GIB, MAX_SIZE,
};
pub use types::{LogLevel, Protocol};

/// The two on-disk configuration layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigShape {
    /// Flat keys at the top level.
    #[default]
    Legacy,
    /// `protocal` and `mooncake_spec` groups.
    Nested,
}

impl ConfigShape {
    /// Guesses the shape of a parsed YAML mapping.
    ///
    /// A document is nested when it has any key that only the nested shape
    /// defines, or a mapping under `protocol`.
    pub fn detect(value: &Value) -> Self {
        let Some(map) = value.as_mapping() else {
            return ConfigShape::Legacy;
        };
        let nested_key = ["contribute_to_cluster_pool_size", "protocal", "mooncake_spec"]
            .iter()
            .any(|key| map.contains_key(*key));
        let grouped_protocol = map.get("protocol").is_some_and(Value::is_mapping);

        if nested_key || grouped_protocol {
            ConfigShape::Nested
        } else {
            ConfigShape::Legacy
        }
    }

    /// Returns the lower-case name of the shape.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigShape::Legacy => "legacy",
            ConfigShape::Nested => "nested",
        }
    }
}

impl fmt::Display for ConfigShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigShape {
    type Err = KvCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" | "flat" => Ok(ConfigShape::Legacy),
            "nested" | "current" => Ok(ConfigShape::Nested),
            _ => Err(KvCacheError::validation(format!(
                "config shape must be one of: legacy, nested (got '{s}')"
            ))),
        }
    }
}

pub(crate) fn positive_size(field: &str, value: i64) -> KvResult<u64> {
    if value <= 0 {
        return Err(KvCacheError::validation(format!("{field} must be positive")));
    }
    Ok(value as u64)
}

pub(crate) fn signed_size(field: &str, value: u64) -> KvResult<i64> {
    i64::try_from(value).map_err(|_| {
        KvCacheError::validation(format!("{field} must not exceed {MAX_SIZE} bytes"))
    })
}

impl KvCacheConfig {
    /// Parses a YAML document of either shape.
    ///
    /// # Errors
    ///
    /// Returns [`KvCacheError::Yaml`] for malformed YAML and
    /// [`KvCacheError::Validation`] for schema or value errors.
    pub fn from_yaml_str(yaml: &str) -> KvResult<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Builds a configuration from a parsed YAML value of either shape.
    ///
    /// # Errors
    ///
    /// See [`KvCacheConfig::from_yaml_str`].
    pub fn from_value(value: Value) -> KvResult<Self> {
        Self::from_value_with_shape(value).map(|(_, config)| config)
    }

    /// Like [`KvCacheConfig::from_value`], also reporting the detected shape.
    ///
    /// # Errors
    ///
    /// See [`KvCacheConfig::from_yaml_str`].
    pub fn from_value_with_shape(value: Value) -> KvResult<(ConfigShape, Self)> {
        if !value.is_mapping() {
            return Err(KvCacheError::validation(
                "configuration must contain a mapping at root level",
            ));
        }
        let shape = ConfigShape::detect(&value);
        debug!(%shape, "parsing configuration");
        Ok((shape, Self::from_value_as(value, shape)?))
    }

    /// Builds a configuration from a parsed YAML value of a known shape.
    ///
    /// # Errors
    ///
    /// See [`KvCacheConfig::from_yaml_str`].
    pub fn from_value_as(value: Value, shape: ConfigShape) -> KvResult<Self> {
        match shape {
            ConfigShape::Legacy => LegacyDocument::from_value(value)?.into_config(),
            ConfigShape::Nested => NestedDocument::from_value(value)?.into_config(),
        }
    }

    /// Serializes to a YAML value in the given shape.
    ///
    /// # Errors
    ///
    /// Returns [`KvCacheError::Validation`] if the configuration cannot be
    /// expressed in the requested shape.
    pub fn to_value(&self, shape: ConfigShape) -> KvResult<Value> {
        let value = match shape {
            ConfigShape::Legacy => serde_yaml::to_value(LegacyDocument::from_config(self)?)?,
            ConfigShape::Nested => serde_yaml::to_value(NestedDocument::from_config(self)?)?,
        };
        Ok(value)
    }

    /// Serializes to YAML text in the given shape.
    ///
    /// # Errors
    ///
    /// See [`KvCacheConfig::to_value`].
    pub fn to_yaml_string(&self, shape: ConfigShape) -> KvResult<String> {
        Ok(serde_yaml::to_string(&self.to_value(shape)?)?)
    }

    /// Serializes to the legacy flat shape.
    ///
    /// # Errors
    ///
    /// See [`KvCacheConfig::to_value`].
    pub fn to_legacy_yaml(&self) -> KvResult<String> {
        self.to_yaml_string(ConfigShape::Legacy)
    }

    /// Serializes to the nested shape.
    ///
    /// # Errors
    ///
    /// See [`KvCacheConfig::to_value`].
    pub fn to_nested_yaml(&self) -> KvResult<String> {
        self.to_yaml_string(ConfigShape::Nested)
    }

    /// Loads a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`KvCacheError::Io`] if the file cannot be read, otherwise see
    /// [`KvCacheConfig::from_yaml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> KvResult<Self> {
        Self::from_file_with_shape(path).map(|(_, config)| config)
    }

    /// Loads a configuration file and reports which shape it was written in.
    ///
    /// # Errors
    ///
    /// See [`KvCacheConfig::from_file`].
    pub fn from_file_with_shape(path: impl AsRef<Path>) -> KvResult<(ConfigShape, Self)> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading configuration");
        let data = std::fs::read_to_string(path)?;
        Self::from_value_with_shape(serde_yaml::from_str(&data)?)
    }

    /// Writes the configuration to a YAML file in the given shape.
    ///
    /// # Errors
    ///
    /// Returns [`KvCacheError::Io`] on write failure, otherwise see
    /// [`KvCacheConfig::to_value`].
    pub fn save_to_file(&self, path: impl AsRef<Path>, shape: ConfigShape) -> KvResult<()> {
        let path = path.as_ref();
        let yaml = self.to_yaml_string(shape)?;
        std::fs::write(path, yaml)?;
        debug!(path = %path.display(), %shape, "saved configuration");
        Ok(())
    }
}

/// Loads and validates a configuration file.
///
/// # Errors
///
/// See [`KvCacheConfig::from_file`].
pub fn load_config(path: impl AsRef<Path>) -> KvResult<KvCacheConfig> {
    let config = KvCacheConfig::from_file(path)?;
    config.validate()?;
    Ok(config)
}

/// Writes a configuration file holding the default values.
///
/// The nested shape cannot express the default 3200 MiB segment size, so
/// nested defaults round the pool contribution up to 4 GiB.
///
/// # Errors
///
/// Returns [`KvCacheError::Io`] on write failure.
pub fn create_default_config(
    path: impl AsRef<Path>,
    shape: ConfigShape,
) -> KvResult<KvCacheConfig> {
    let config = match shape {
        ConfigShape::Legacy => KvCacheConfig::default(),
        ConfigShape::Nested => KvCacheConfig::builder()
            .global_segment_size(DEFAULT_GLOBAL_SEGMENT_SIZE.div_ceil(GIB) * GIB)
            .build()?,
    };
    config.save_to_file(path, shape)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::BackendType;
    use tempfile::TempDir;

    const NESTED: &str = r#"
local_hostname: worker01
contribute_to_cluster_pool_size: 8
protocal:
  type: ib
  rdma_device_name: mlx5_0
log_level: DEBUG
mooncake_spec:
  local_buffer_size: 1073741824
  metadata_server: "192.168.1.100:2379"
  master_server_address: "192.168.1.100:50051"
team: inference
"#;

    #[test]
    fn detects_shapes() {
        let flat: Value = serde_yaml::from_str("protocol: tcp\n").unwrap();
        assert_eq!(ConfigShape::detect(&flat), ConfigShape::Legacy);

        let nested: Value = serde_yaml::from_str(NESTED).unwrap();
        assert_eq!(ConfigShape::detect(&nested), ConfigShape::Nested);

        let grouped: Value = serde_yaml::from_str("protocol:\n  type: tcp\n").unwrap();
        assert_eq!(ConfigShape::detect(&grouped), ConfigShape::Nested);
    }

    #[test]
    fn nested_without_spec_is_detected_and_rejected() {
        let yaml = "local_hostname: a\n\
                    contribute_to_cluster_pool_size: 1\n\
                    protocal:\n  type: tcp\n\
                    log_level: INFO\n";
        let err = KvCacheConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn root_must_be_mapping() {
        assert!(KvCacheConfig::from_yaml_str("- a\n- b\n").unwrap_err().is_validation());
    }

    #[test]
    fn malformed_yaml_is_yaml_error() {
        let err = KvCacheConfig::from_yaml_str("a: [unclosed\n").unwrap_err();
        assert!(matches!(err, KvCacheError::Yaml(_)));
    }

    #[test]
    fn nested_round_trip_keeps_passthrough() {
        let config = KvCacheConfig::from_yaml_str(NESTED).unwrap();
        assert_eq!(config.get_extra("team"), Some(&Value::from("inference")));

        let yaml = config.to_nested_yaml().unwrap();
        assert!(yaml.contains("protocal:"));
        assert!(yaml.contains("team: inference"));
        let reparsed = KvCacheConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn legacy_round_trip() {
        let config = KvCacheConfig::builder()
            .protocol(Protocol::Udp)
            .backend(BackendType::Rust)
            .enable_metrics(true)
            .master_server_address(None)
            .extra("cache_ttl", Value::from(30))
            .build()
            .unwrap();

        let reparsed = KvCacheConfig::from_yaml_str(&config.to_legacy_yaml().unwrap()).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn nested_config_converts_to_legacy() {
        let config = KvCacheConfig::from_yaml_str(NESTED).unwrap();
        let flat = KvCacheConfig::from_yaml_str(&config.to_legacy_yaml().unwrap()).unwrap();
        assert_eq!(flat, config);
    }

    #[test]
    fn shape_names() {
        assert_eq!("flat".parse::<ConfigShape>().unwrap(), ConfigShape::Legacy);
        assert_eq!("Nested".parse::<ConfigShape>().unwrap(), ConfigShape::Nested);
        assert!("xml".parse::<ConfigShape>().is_err());
    }

    #[test]
    fn file_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kvcache.yaml");

        let config = KvCacheConfig::builder().local_hostname("h1").build().unwrap();
        config.save_to_file(&path, ConfigShape::Legacy).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn file_load_reports_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested.yaml");
        std::fs::write(&path, NESTED).unwrap();

        let (shape, config) = KvCacheConfig::from_file_with_shape(&path).unwrap();
        assert_eq!(shape, ConfigShape::Nested);
        assert_eq!(config.local_hostname(), "worker01");

        std::fs::write(&path, "- worker01\n").unwrap();
        let err = KvCacheConfig::from_file_with_shape(&path).unwrap_err();
        assert!(err.to_string().contains("mapping at root level"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, KvCacheError::Io(_)));
    }

    #[test]
    fn default_config_files() {
        let dir = TempDir::new().unwrap();

        let legacy_path = dir.path().join("legacy.yaml");
        let written = create_default_config(&legacy_path, ConfigShape::Legacy).unwrap();
        assert_eq!(written, KvCacheConfig::default());
        assert_eq!(load_config(&legacy_path).unwrap(), written);

        let nested_path = dir.path().join("nested.yaml");
        let written = create_default_config(&nested_path, ConfigShape::Nested).unwrap();
        assert_eq!(written.global_segment_size(), 4 * GIB);
        assert_eq!(load_config(&nested_path).unwrap(), written);
    }
}
