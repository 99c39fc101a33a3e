//! Show command implementation.

use super::CliError;
use kvcache_core::{ConfigShape, KvCacheConfig};
use std::path::Path;

/// Renders `config` in the requested output format and layout.
pub fn render(
    config: &KvCacheConfig,
    format: &str,
    shape: ConfigShape,
) -> Result<String, Box<dyn std::error::Error>> {
    let rendered = match format {
        "yaml" => config.to_yaml_string(shape)?,
        "json" => serde_json::to_string_pretty(&config.to_value(shape)?)?,
        "text" => text_output(config),
        other => {
            return Err(CliError::UnknownFormat(other.to_string(), "text, json, yaml").into());
        }
    };
    Ok(rendered)
}

/// Runs the show command.
pub fn run(
    path: &Path,
    format: &str,
    shape: Option<ConfigShape>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (detected, config) = KvCacheConfig::from_file_with_shape(path)?;

    let output = render(&config, format, shape.unwrap_or(detected))?;
    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn text_output(config: &KvCacheConfig) -> String {
    let mut out = String::new();
    out.push_str("KVCache Configuration\n");
    out.push_str("=====================\n\n");
    out.push_str(&format!("Backend:          {}\n", config.backend_type()));
    out.push_str(&format!("Local hostname:   {}\n", config.local_hostname()));
    out.push_str(&format!("Metadata server:  {}\n", config.metadata_server()));
    out.push_str(&format!(
        "Master server:    {}\n",
        config.master_server_address().unwrap_or("-")
    ));
    out.push_str(&format!("Protocol:         {}\n", config.protocol()));
    out.push_str(&format!("Device:           {}\n", config.device_name()));
    out.push_str(&format!(
        "Global segment:   {}\n",
        format_size(config.global_segment_size())
    ));
    out.push_str(&format!(
        "Local buffer:     {}\n",
        format_size(config.local_buffer_size())
    ));
    out.push_str(&format!("Log level:        {}\n", config.log_level()));
    out.push_str(&format!("Metrics:          {}\n", config.enable_metrics()));

    if !config.extra().is_empty() {
        out.push_str("\nExtra keys:\n");
        for key in config.extra().keys() {
            out.push_str(&format!("  {key}\n"));
        }
    }
    out
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvcache_core::GIB;

    #[test]
    fn converts_between_layouts() {
        let config = KvCacheConfig::builder()
            .local_hostname("n1")
            .global_segment_size(2 * GIB)
            .build()
            .unwrap();

        let nested = render(&config, "yaml", ConfigShape::Nested).unwrap();
        assert!(nested.contains("contribute_to_cluster_pool_size: 2"));
        assert_eq!(KvCacheConfig::from_yaml_str(&nested).unwrap(), config);

        let legacy = render(&config, "yaml", ConfigShape::Legacy).unwrap();
        assert!(legacy.contains("global_segment_size: 2147483648"));
    }

    #[test]
    fn json_output_is_valid() {
        let config = KvCacheConfig::default();
        let json = render(&config, "json", ConfigShape::Legacy).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["local_hostname"], "localhost");
        assert_eq!(parsed["protocol"], "tcp");
    }

    #[test]
    fn text_output_lists_fields() {
        let text = render(&KvCacheConfig::default(), "text", ConfigShape::Legacy).unwrap();
        assert!(text.contains("Backend:          mooncake"));
        assert!(text.contains("Protocol:         tcp"));
    }

    #[test]
    fn nested_layout_rejects_udp() {
        let config = KvCacheConfig::builder()
            .protocol(kvcache_core::Protocol::Udp)
            .global_segment_size(GIB)
            .build()
            .unwrap();
        assert!(render(&config, "yaml", ConfigShape::Nested).is_err());
    }

    #[test]
    fn run_rejects_non_mapping_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "just a string\n").unwrap();

        let err = run(&path, "text", None).unwrap_err();
        assert!(err.to_string().contains("mapping at root level"));
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(512 * 1024 * 1024), "512.0 MB");
    }
}
