//! Aggregate error type for the registry engine.
//!
//! Every failure the facade surfaces maps onto a five-way taxonomy (not
//! found, conflict, validation, unavailable, internal), exposed as an
//! HTTP-style status code so the transport layer never has to inspect
//! error internals.

use miette::Diagnostic;
use thiserror::Error;
use wharf_config::ConfigError;
use wharf_package::PackageError;
use wharf_store::StoreError;
use wharf_uplink::UplinkError;

/// Top-level error for registry operations.
#[derive(Error, Diagnostic, Debug)]
pub enum WharfError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Package(#[from] PackageError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Uplink(#[from] UplinkError),

    #[error("No such package `{0}`")]
    #[diagnostic(code(wharf::not_found))]
    PackageNotFound(String),

    #[error("Version `{version}` of `{package}` not found")]
    #[diagnostic(code(wharf::version_not_found))]
    VersionNotFound { package: String, version: String },

    #[error("{0}")]
    #[diagnostic(code(wharf::conflict))]
    Conflict(String),

    #[error("{0}")]
    #[diagnostic(code(wharf::validation))]
    Validation(String),

    #[error("{0}")]
    #[diagnostic(
        code(wharf::unavailable),
        help("One or more uplinks are unreachable; try again later")
    )]
    Unavailable(String),

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(wharf::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },
}

impl WharfError {
    /// HTTP-style status for this failure.
    pub fn status(&self) -> u16 {
        match self {
            WharfError::PackageNotFound(_) | WharfError::VersionNotFound { .. } => 404,
            WharfError::Conflict(_) => 409,
            WharfError::Validation(_) | WharfError::Package(_) => 422,
            WharfError::Unavailable(_) => 503,
            WharfError::Store(err) => match err {
                StoreError::NotFound { .. } | StoreError::FileNotFound { .. } => 404,
                StoreError::AlreadyExists { .. }
                | StoreError::FileExists { .. }
                | StoreError::RevisionMismatch { .. } => 409,
                _ => 500,
            },
            WharfError::Uplink(err) => match err {
                UplinkError::NotFound { .. } => 404,
                UplinkError::Validation(_) => 422,
                UplinkError::FailedToFetch { .. } | UplinkError::RemoteStatus { .. } => 503,
                _ => 500,
            },
            _ => 500,
        }
    }
}

/// A specialized Result type for registry operations.
pub type Result<T> = std::result::Result<T, WharfError>;
