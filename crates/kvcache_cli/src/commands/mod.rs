//! CLI command implementations.

pub mod backends;
pub mod init_config;
pub mod show;
pub mod validate;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the CLI itself, as opposed to the core library.
#[derive(Debug, Error)]
pub enum CliError {
    /// Refusing to overwrite a file without `--force`.
    #[error("{} already exists (use --force to overwrite)", .0.display())]
    AlreadyExists(PathBuf),

    /// Unsupported `--format` value.
    #[error("unknown output format '{0}' (expected one of: {1})")]
    UnknownFormat(String, &'static str),
}
