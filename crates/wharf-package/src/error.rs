//! Error types for the package document crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while validating or manipulating package metadata.
#[derive(Error, Diagnostic, Debug)]
pub enum PackageError {
    #[error("Metadata is for `{actual}`, expected `{expected}`")]
    #[diagnostic(
        code(wharf_package::name_mismatch),
        help("The response body does not describe the requested package")
    )]
    NameMismatch { expected: String, actual: String },

    #[error("Version `{0}` is not valid semver")]
    #[diagnostic(code(wharf_package::invalid_version))]
    InvalidVersion(String),

    #[error(transparent)]
    #[diagnostic(
        code(wharf_package::json),
        help("The metadata document may be corrupted or in an invalid format")
    )]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for package document operations.
pub type Result<T> = std::result::Result<T, PackageError>;
