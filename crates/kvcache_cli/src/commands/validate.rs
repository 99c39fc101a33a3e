//! Validate command implementation.

use super::CliError;
use kvcache_core::{KvCacheConfig, KvResult};
use serde::Serialize;
use std::path::Path;

/// Outcome of validating a configuration file.
#[derive(Debug, Serialize)]
pub struct ValidateReport {
    /// File that was checked.
    pub path: String,
    /// Detected layout.
    pub shape: String,
    /// Selected backend.
    pub backend: String,
    /// One-line summary of the configuration.
    pub summary: String,
}

/// Loads and validates `path`.
pub fn check(path: &Path) -> KvResult<ValidateReport> {
    let (shape, config) = KvCacheConfig::from_file_with_shape(path)?;

    Ok(ValidateReport {
        path: path.display().to_string(),
        shape: shape.to_string(),
        backend: config.backend_type().to_string(),
        summary: config.to_string(),
    })
}

/// Runs the validate command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let report = check(path)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "text" => {
            println!("{}: OK ({} layout)", report.path, report.shape);
            println!("  {}", report.summary);
        }
        other => return Err(CliError::UnknownFormat(other.to_string(), "text, json").into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvcache_core::KvCacheError;
    use tempfile::TempDir;

    fn write(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reports_detected_shape() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "local_hostname: n1\n\
             contribute_to_cluster_pool_size: 2\n\
             protocal:\n  type: tcp\n\
             log_level: INFO\n\
             mooncake_spec:\n  local_buffer_size: 1024\n  metadata_server: 10.0.0.1:2379\n",
        );

        let report = check(&path).unwrap();
        assert_eq!(report.shape, "nested");
        assert_eq!(report.backend, "mooncake");
        assert!(report.summary.contains("n1"));
    }

    #[test]
    fn rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "global_segment_size: 0\n");

        let err = check(&path).unwrap_err();
        assert!(matches!(err, KvCacheError::Validation { .. }));
    }

    #[test]
    fn rejects_non_mapping_root() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "- local_hostname\n- n1\n");

        let err = check(&path).unwrap_err();
        assert!(matches!(err, KvCacheError::Validation { .. }));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "local_hostname: n1\n");

        let err = run(&path, "xml").unwrap_err();
        assert!(err.to_string().contains("unknown output format"));
    }
}
