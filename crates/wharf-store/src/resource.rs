//! Raw resource primitives under the storage root.
//!
//! These are the thin I/O calls everything else builds on: read a resource
//! or learn it is missing, write one atomically (temp file + rename so a
//! crash mid-write never leaves a half-written document), create one only
//! if absent, delete one.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Reads a resource's bytes. A missing file surfaces as the raw
/// [`io::ErrorKind::NotFound`] for the caller to map.
pub fn read_resource(path: &Path) -> io::Result<Vec<u8>> {
    fs::read(path)
}

/// Atomically replaces a resource with `bytes`.
///
/// The bytes are written to a `.tmp` sibling, flushed to disk and renamed
/// over the destination in one step.
pub fn write_resource(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp = temp_sibling(path);

    let mut file = File::create(&temp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    if let Err(err) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(err);
    }

    Ok(())
}

/// Creates a resource, failing with [`io::ErrorKind::AlreadyExists`] when a
/// file is already present at `path`.
pub fn create_resource(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Deletes a resource. A missing file surfaces as
/// [`io::ErrorKind::NotFound`].
pub fn delete_resource(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

/// Names of the plain files directly under `dir`.
pub fn list_resources(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
    }
    names.sort();
    Ok(names)
}

pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".tmp-{}", std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resource.json");

        write_resource(&path, b"{\"a\":1}").unwrap();
        assert_eq!(read_resource(&path).unwrap(), b"{\"a\":1}");

        // overwrite is allowed
        write_resource(&path, b"{}").unwrap();
        assert_eq!(read_resource(&path).unwrap(), b"{}");
    }

    #[test]
    fn test_read_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_resource(&dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_create_resource_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resource.json");

        create_resource(&path, b"{}").unwrap();
        let err = create_resource(&path, b"{}").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_delete_resource() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resource.json");
        write_resource(&path, b"{}").unwrap();

        delete_resource(&path).unwrap();
        let err = delete_resource(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_list_resources() {
        let dir = tempfile::tempdir().unwrap();
        write_resource(&dir.path().join("b.tgz"), b"x").unwrap();
        write_resource(&dir.path().join("a.tgz"), b"x").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();

        let names = list_resources(dir.path()).unwrap();
        assert_eq!(names, vec!["a.tgz".to_string(), "b.tgz".to_string()]);
    }
}
