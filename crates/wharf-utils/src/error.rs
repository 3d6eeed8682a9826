//! Error types for wharf-utils.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by filesystem helpers.
#[derive(Error, Diagnostic, Debug)]
pub enum FileSystemError {
    #[error("Failed to {action} file `{path}`: {source}")]
    #[diagnostic(code(wharf_utils::fs::file))]
    File {
        path: PathBuf,
        action: &'static str,
        source: std::io::Error,
    },

    #[error("Failed to {action} directory `{path}`: {source}")]
    #[diagnostic(code(wharf_utils::fs::directory))]
    Directory {
        path: PathBuf,
        action: &'static str,
        source: std::io::Error,
    },

    #[error("`{path}` is not a directory")]
    #[diagnostic(code(wharf_utils::fs::not_a_directory))]
    NotADirectory { path: PathBuf },
}

/// Errors raised while hashing file or stream contents.
#[derive(Error, Diagnostic, Debug)]
pub enum HashError {
    #[error("Failed to read `{path}`: {source}")]
    #[diagnostic(code(wharf_utils::hash::read))]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors raised while mapping package names to storage paths.
#[derive(Error, Diagnostic, Debug)]
pub enum PathError {
    #[error("Invalid package name `{name}`")]
    #[diagnostic(
        code(wharf_utils::path::invalid_name),
        help("Package names may only contain URL-safe characters")
    )]
    InvalidName { name: String },

    #[error("Invalid file name `{name}`")]
    #[diagnostic(code(wharf_utils::path::invalid_file_name))]
    InvalidFileName { name: String },
}

pub type FileSystemResult<T> = std::result::Result<T, FileSystemError>;
pub type HashResult<T> = std::result::Result<T, HashError>;
pub type PathResult<T> = std::result::Result<T, PathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_error_display() {
        let err = PathError::InvalidName {
            name: "../evil".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid package name `../evil`");
    }

    #[test]
    fn test_file_system_error_display() {
        let err = FileSystemError::NotADirectory {
            path: PathBuf::from("/some/file"),
        };
        assert_eq!(err.to_string(), "`/some/file` is not a directory");
    }
}
