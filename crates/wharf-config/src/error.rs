//! Error types for configuration loading.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file `{path}`: {source}")]
    #[diagnostic(
        code(wharf_config::read),
        help("Check that the file exists and is readable")
    )]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(wharf_config::parse), help("Check your configuration syntax"))]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(wharf_config::invalid))]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
