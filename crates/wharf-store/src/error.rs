//! Error types for the storage crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while reading or writing package storage.
#[derive(Error, Diagnostic, Debug)]
pub enum StoreError {
    #[error("No such package `{name}`")]
    #[diagnostic(code(wharf_store::not_found))]
    NotFound { name: String },

    #[error("No such file `{file}`")]
    #[diagnostic(code(wharf_store::file_not_found))]
    FileNotFound { file: String },

    #[error("Package `{name}` already exists")]
    #[diagnostic(code(wharf_store::conflict))]
    AlreadyExists { name: String },

    #[error("File `{file}` already exists")]
    #[diagnostic(code(wharf_store::file_conflict))]
    FileExists { file: String },

    #[error("Concurrent update detected for `{name}`")]
    #[diagnostic(
        code(wharf_store::revision_mismatch),
        help("Another writer committed first; re-read and re-apply the change")
    )]
    RevisionMismatch { name: String },

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(wharf_store::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(
        code(wharf_store::json),
        help("The stored document may be corrupted")
    )]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(wharf_store::path))]
    PathError(#[from] wharf_utils::error::PathError),

    #[error(transparent)]
    #[diagnostic(code(wharf_store::fs))]
    FileSystemError(#[from] wharf_utils::error::FileSystemError),
}

/// A specialized Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    /// Adds context to an error, describing what action was being performed.
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            StoreError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
