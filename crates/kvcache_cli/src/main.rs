//! KVCache CLI
//!
//! Command-line tools for KV cache configuration and backends.
//!
//! # Commands
//!
//! - `init-config` - Write a configuration file with default values
//! - `validate` - Load and validate a configuration file
//! - `show` - Print a configuration, optionally converted to another shape
//! - `backends` - List backends and their availability

mod commands;

use clap::{Parser, Subcommand};
use kvcache_core::{ConfigShape, LogLevel};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// KV cache command-line tools.
#[derive(Parser)]
#[command(name = "kvcache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Log level (DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[arg(global = true, long)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file with default values
    InitConfig {
        /// Where to write the file
        path: PathBuf,

        /// Use the nested layout instead of flat keys
        #[arg(short, long)]
        nested: bool,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Load and validate a configuration file
    Validate {
        /// Configuration file
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print a configuration file
    Show {
        /// Configuration file
        path: PathBuf,

        /// Output format (text, json, yaml)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Layout to print in (legacy, nested); defaults to the file's own
        #[arg(short, long)]
        shape: Option<ConfigShape>,
    },

    /// List backends and their availability
    Backends {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if let Some(level) = cli.log_level {
        EnvFilter::new(level.as_filter_directive())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::InitConfig {
            path,
            nested,
            force,
        } => {
            let shape = if nested {
                ConfigShape::Nested
            } else {
                ConfigShape::Legacy
            };
            commands::init_config::run(&path, shape, force)?;
        }
        Commands::Validate { path, format } => {
            commands::validate::run(&path, &format)?;
        }
        Commands::Show {
            path,
            format,
            shape,
        } => {
            commands::show::run(&path, &format, shape)?;
        }
        Commands::Backends { format } => {
            commands::backends::run(&format)?;
        }
        Commands::Version => {
            println!("KVCache CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("KVCache Core v{}", kvcache_core::VERSION);
        }
    }

    Ok(())
}
