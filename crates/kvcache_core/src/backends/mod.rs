//! Backend descriptors, adapters and the backend registry.

mod mooncake;
mod registry;
mod rust;

use std::fmt;
use std::str::FromStr;

use crate::error::KvCacheError;

pub use mooncake::{MooncakeProvider, MooncakeStore};
pub use registry::{BackendProvider, BackendRegistry};
pub use rust::{RustProvider, RustStore};

/// Identifies which adapter to construct.
///
/// Only used at construction time; a store handle does not depend on the
/// descriptor it was built from beyond reporting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum BackendType {
    /// The Mooncake distributed store.
    #[default]
    Mooncake,
    /// Placeholder for a native Rust engine. Never available.
    Rust,
}

impl BackendType {
    /// Every known backend, in auto-detection preference order.
    pub const PREFERENCE: [BackendType; 2] = [BackendType::Mooncake, BackendType::Rust];

    /// Returns the lower-case identifier used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::Mooncake => "mooncake",
            BackendType::Rust => "rust",
        }
    }

    /// Maps a configured backend name, falling back to Mooncake when unmapped.
    pub fn from_config_str(s: &str) -> Self {
        s.parse().unwrap_or(BackendType::Mooncake)
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendType {
    type Err = KvCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mooncake" => Ok(BackendType::Mooncake),
            "rust" => Ok(BackendType::Rust),
            _ => Err(KvCacheError::backend_not_found(
                s,
                "unknown backend type (expected one of: mooncake, rust)",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Mooncake".parse::<BackendType>().unwrap(), BackendType::Mooncake);
        assert_eq!("RUST".parse::<BackendType>().unwrap(), BackendType::Rust);
    }

    #[test]
    fn unknown_name_is_backend_not_found() {
        let err = "redis".parse::<BackendType>().unwrap_err();
        assert!(matches!(
            err,
            KvCacheError::BackendNotFound { ref backend, .. } if backend == "redis"
        ));
    }

    #[test]
    fn config_mapping_defaults_to_mooncake() {
        assert_eq!(BackendType::from_config_str("rust"), BackendType::Rust);
        assert_eq!(BackendType::from_config_str("unknown"), BackendType::Mooncake);
    }

    #[test]
    fn mooncake_is_preferred() {
        assert_eq!(BackendType::PREFERENCE[0], BackendType::Mooncake);
        assert_eq!(BackendType::default(), BackendType::Mooncake);
    }
}
