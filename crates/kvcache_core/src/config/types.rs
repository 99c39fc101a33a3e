//! Closed value sets used by the configuration model.

use std::fmt;
use std::str::FromStr;

use crate::error::KvCacheError;

/// Transport protocol handed to the engine at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    /// TCP transport.
    #[default]
    Tcp,
    /// UDP transport. Only the legacy flat shape accepts it.
    Udp,
    /// InfiniBand / RDMA transport. Requires a device name.
    Ib,
}

impl Protocol {
    /// Returns the wire name passed to the engine.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Ib => "ib",
        }
    }

    /// Returns true if the protocol needs an RDMA device name.
    pub fn requires_device(&self) -> bool {
        matches!(self, Protocol::Ib)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = KvCacheError;

    /// Accepts `tcp`, `udp`, `ib` and `rdma` (an alias of `ib`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "ib" | "rdma" => Ok(Protocol::Ib),
            _ => Err(KvCacheError::validation(format!(
                "protocol must be one of: tcp, udp, ib (got '{s}')"
            ))),
        }
    }
}

/// Log level recorded in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Verbose diagnostics.
    Debug,
    /// Normal operation.
    #[default]
    Info,
    /// Something unexpected that did not fail.
    Warning,
    /// A failed operation.
    Error,
    /// An unrecoverable failure.
    Critical,
}

impl LogLevel {
    /// Returns the canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Returns the matching `tracing_subscriber::EnvFilter` directive.
    ///
    /// `tracing` has no level above error, so `CRITICAL` maps to `error`.
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }

    /// Returns the matching `tracing` level.
    pub fn as_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error | LogLevel::Critical => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = KvCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            _ => Err(KvCacheError::validation(format!(
                "log_level must be one of: DEBUG, INFO, WARNING, ERROR, CRITICAL (got '{s}')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_parses_aliases() {
        assert_eq!("tcp".parse::<Protocol>().unwrap(), Protocol::Tcp);
        assert_eq!("UDP".parse::<Protocol>().unwrap(), Protocol::Udp);
        assert_eq!("ib".parse::<Protocol>().unwrap(), Protocol::Ib);
        assert_eq!("rdma".parse::<Protocol>().unwrap(), Protocol::Ib);
        assert!("quic".parse::<Protocol>().unwrap_err().is_validation());
    }

    #[test]
    fn only_ib_requires_device() {
        assert!(Protocol::Ib.requires_device());
        assert!(!Protocol::Tcp.requires_device());
        assert!(!Protocol::Udp.requires_device());
    }

    #[test]
    fn log_level_is_case_insensitive() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("Warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("CRITICAL".parse::<LogLevel>().unwrap(), LogLevel::Critical);
        assert!("TRACE".parse::<LogLevel>().is_err());
        assert!("".parse::<LogLevel>().is_err());
    }

    #[test]
    fn log_level_filter_directives() {
        assert_eq!(LogLevel::Warning.as_filter_directive(), "warn");
        assert_eq!(LogLevel::Critical.as_filter_directive(), "error");
        assert_eq!(LogLevel::Debug.as_tracing_level(), tracing::Level::DEBUG);
    }
}
