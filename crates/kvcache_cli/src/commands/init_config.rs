//! Init-config command implementation.

use super::CliError;
use kvcache_core::{create_default_config, ConfigShape};
use std::path::Path;

/// Runs the init-config command.
pub fn run(path: &Path, shape: ConfigShape, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(CliError::AlreadyExists(path.to_path_buf()).into());
    }

    let config = create_default_config(path, shape)?;
    println!("Created {} configuration at {}", shape, path.display());
    println!("  {config}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvcache_core::{load_config, GIB};
    use tempfile::TempDir;

    #[test]
    fn writes_loadable_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kvcache.yaml");

        run(&path, ConfigShape::Legacy, false).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.local_hostname(), "localhost");
    }

    #[test]
    fn nested_defaults_use_whole_gib() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kvcache.yaml");

        run(&path, ConfigShape::Nested, false).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("mooncake_spec"));
        assert_eq!(load_config(&path).unwrap().global_segment_size(), 4 * GIB);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kvcache.yaml");
        std::fs::write(&path, "local_hostname: keep-me\n").unwrap();

        let err = run(&path, ConfigShape::Legacy, false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(load_config(&path).unwrap().local_hostname(), "keep-me");

        run(&path, ConfigShape::Legacy, true).unwrap();
        assert_eq!(load_config(&path).unwrap().local_hostname(), "localhost");
    }
}
