//! Tarball file streams.
//!
//! Writes go to a temp sibling and only reach the final name on
//! [`TarballWriter::commit`]; dropping an uncommitted writer (or calling
//! [`TarballWriter::abort`]) releases the partial file. Reads expose the
//! content length before any byte is streamed so transfer headers can be
//! set ahead of the body.

use std::{
    fs::{self, File},
    io::{self, Read, Write},
    path::PathBuf,
};

use tracing::debug;

use crate::{
    error::{Result, StoreError},
    resource::temp_sibling,
};

/// Streams an uploaded tarball into the store.
pub struct TarballWriter {
    final_path: PathBuf,
    temp_path: PathBuf,
    file: Option<File>,
    committed: bool,
}

impl TarballWriter {
    /// Opens a writer for `final_path`.
    ///
    /// # Errors
    ///
    /// * [`StoreError::FileExists`] if the destination already exists; the
    ///   check runs before any byte is accepted.
    pub fn create(final_path: PathBuf) -> Result<Self> {
        if final_path.exists() {
            return Err(StoreError::FileExists {
                file: file_name_of(&final_path),
            });
        }

        if let Some(parent) = final_path.parent() {
            wharf_utils::fs::ensure_dir_exists(parent)?;
        }

        let temp_path = temp_sibling(&final_path);
        let file = File::create(&temp_path).map_err(|err| StoreError::IoError {
            action: format!("creating upload file `{}`", temp_path.display()),
            source: err,
        })?;

        Ok(Self {
            final_path,
            temp_path,
            file: Some(file),
            committed: false,
        })
    }

    /// Promotes the temp file to its final name.
    ///
    /// # Errors
    ///
    /// * [`StoreError::FileExists`] if a concurrent upload claimed the name
    ///   first; the temp file is released.
    pub fn commit(mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().and_then(|_| file.sync_all()).map_err(|err| {
                StoreError::IoError {
                    action: format!("flushing upload file `{}`", self.temp_path.display()),
                    source: err,
                }
            })?;
        }

        if self.final_path.exists() {
            let _ = fs::remove_file(&self.temp_path);
            self.committed = true;
            return Err(StoreError::FileExists {
                file: file_name_of(&self.final_path),
            });
        }

        fs::rename(&self.temp_path, &self.final_path).map_err(|err| StoreError::IoError {
            action: format!("committing upload to `{}`", self.final_path.display()),
            source: err,
        })?;

        self.committed = true;
        Ok(())
    }

    /// Releases the partial file without committing anything.
    pub fn abort(mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) {
        self.file.take();
        if !self.committed {
            if let Err(err) = fs::remove_file(&self.temp_path) {
                if err.kind() != io::ErrorKind::NotFound {
                    debug!(path = %self.temp_path.display(), %err, "failed to remove partial upload");
                }
            }
            self.committed = true;
        }
    }
}

impl Write for TarballWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.write(buf),
            None => Err(io::Error::other("upload already finished")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for TarballWriter {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Streams a stored tarball out of the store.
pub struct TarballReader {
    file: File,
    length: u64,
}

impl TarballReader {
    /// Opens a stored tarball.
    ///
    /// # Errors
    ///
    /// * [`StoreError::FileNotFound`] if no tarball exists at `path`.
    pub fn open(path: PathBuf) -> Result<Self> {
        let file = File::open(&path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                StoreError::FileNotFound {
                    file: file_name_of(&path),
                }
            } else {
                StoreError::IoError {
                    action: format!("opening tarball `{}`", path.display()),
                    source: err,
                }
            }
        })?;

        let length = file
            .metadata()
            .map_err(|err| StoreError::IoError {
                action: format!("reading tarball metadata `{}`", path.display()),
                source: err,
            })?
            .len();

        Ok(Self { file, length })
    }

    /// Content length, known before streaming begins.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl Read for TarballReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

fn file_name_of(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_commit_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg-1.0.0.tgz");

        let mut writer = TarballWriter::create(path.clone()).unwrap();
        writer.write_all(b"tarball bytes").unwrap();
        writer.commit().unwrap();

        let mut reader = TarballReader::open(path).unwrap();
        assert_eq!(reader.len(), 13);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"tarball bytes");
    }

    #[test]
    fn test_abort_releases_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg-1.0.0.tgz");

        let mut writer = TarballWriter::create(path.clone()).unwrap();
        writer.write_all(b"partial").unwrap();
        writer.abort();

        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_drop_releases_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg-1.0.0.tgz");

        {
            let mut writer = TarballWriter::create(path.clone()).unwrap();
            writer.write_all(b"partial").unwrap();
        }

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_existing_file_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg-1.0.0.tgz");
        fs::write(&path, b"already here").unwrap();

        assert!(matches!(
            TarballWriter::create(path),
            Err(StoreError::FileExists { .. })
        ));
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            TarballReader::open(dir.path().join("missing.tgz")),
            Err(StoreError::FileNotFound { .. })
        ));
    }
}
