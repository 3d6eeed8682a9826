use std::{fs, path::Path};

use crate::error::{FileSystemError, FileSystemResult};

pub trait FileSystemProvider {
    /// Removes the specified file or directory safely.
    ///
    /// If the path does not exist, this function returns `Ok(())` without
    /// error. Directories are removed recursively, files with
    /// [`std::fs::remove_file`].
    ///
    /// # Errors
    ///
    /// Returns a [`FileSystemError::File`] if the removal fails for any
    /// reason other than the path not existing.
    fn safe_remove<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()>;

    /// Creates a directory structure if it doesn't exist.
    ///
    /// If the directory already exists this does nothing. If the path exists
    /// but is not a directory an error is returned.
    ///
    /// # Errors
    ///
    /// * [`FileSystemError::Directory`] if the directory could not be created.
    /// * [`FileSystemError::NotADirectory`] if the path exists but is not a
    ///   directory.
    fn ensure_dir_exists<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()>;
}

#[derive(Default, Clone)]
pub struct StandardFileSystemProvider;

impl FileSystemProvider for StandardFileSystemProvider {
    fn safe_remove<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(());
        }

        let result = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };

        result.map_err(|err| FileSystemError::File {
            path: path.to_path_buf(),
            action: "remove",
            source: err,
        })
    }

    fn ensure_dir_exists<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).map_err(|err| FileSystemError::Directory {
                path: path.to_path_buf(),
                action: "create",
                source: err,
            })?;
        } else if !path.is_dir() {
            return Err(FileSystemError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        Ok(())
    }
}

/// Creates a directory structure if it doesn't exist.
///
/// Convenience wrapper over [`FileSystemProvider::ensure_dir_exists`] on
/// [`StandardFileSystemProvider`].
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    StandardFileSystemProvider.ensure_dir_exists(path)
}

/// Removes the specified file or directory safely.
///
/// Convenience wrapper over [`FileSystemProvider::safe_remove`] on
/// [`StandardFileSystemProvider`].
pub fn safe_remove<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    StandardFileSystemProvider.safe_remove(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_remove_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nothing-here");
        assert!(safe_remove(&missing).is_ok());
    }

    #[test]
    fn test_safe_remove_file_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, b"data").unwrap();
        safe_remove(&file).unwrap();
        assert!(!file.exists());

        let nested = dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        safe_remove(dir.path().join("a")).unwrap();
        assert!(!nested.exists());
    }

    #[test]
    fn test_ensure_dir_exists() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("x/y/z");
        ensure_dir_exists(&nested).unwrap();
        assert!(nested.is_dir());
        // second call is a no-op
        ensure_dir_exists(&nested).unwrap();
    }

    #[test]
    fn test_ensure_dir_exists_on_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();
        assert!(ensure_dir_exists(&file).is_err());
    }
}
