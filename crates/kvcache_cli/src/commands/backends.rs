//! Backends command implementation.

use super::CliError;
use kvcache_core::BackendRegistry;
use serde::Serialize;

/// Availability of every registered backend.
#[derive(Debug, Serialize)]
pub struct BackendsReport {
    /// One entry per registered backend, in preference order.
    pub backends: Vec<BackendStatus>,
    /// The backend auto-detection would pick.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best: Option<String>,
}

/// Availability of one backend.
#[derive(Debug, Serialize)]
pub struct BackendStatus {
    /// Backend name.
    pub name: String,
    /// Whether its engine loads.
    pub available: bool,
    /// Why it does not load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Probes every backend in `registry`.
pub fn report(registry: &BackendRegistry) -> BackendsReport {
    let backends = registry
        .registered_backends()
        .into_iter()
        .map(|backend| match registry.probe(backend) {
            Ok(()) => BackendStatus {
                name: backend.to_string(),
                available: true,
                reason: None,
            },
            Err(e) => BackendStatus {
                name: backend.to_string(),
                available: false,
                reason: Some(e.to_string()),
            },
        })
        .collect();

    BackendsReport {
        backends,
        best: registry.detect_best_backend().ok().map(|b| b.to_string()),
    }
}

/// Runs the backends command.
pub fn run(format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = report(&BackendRegistry::builtin());

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        "text" => print_text_output(&result),
        other => return Err(CliError::UnknownFormat(other.to_string(), "text, json").into()),
    }
    Ok(())
}

fn print_text_output(result: &BackendsReport) {
    println!("Backends:");
    for status in &result.backends {
        let mark = if status.available { "available" } else { "unavailable" };
        match &status.reason {
            Some(reason) => println!("  {:<10} {} ({})", status.name, mark, reason),
            None => println!("  {:<10} {}", status.name, mark),
        }
    }
    println!();
    match &result.best {
        Some(best) => println!("Auto-detected: {best}"),
        None => println!("Auto-detected: none"),
    }
}
