//! The per-package document store.
//!
//! One [`PackageStore`] owns a storage root; every package lives in its own
//! directory (scoped names nest one level) holding the metadata document
//! plus its tarball files. The store knows nothing about uplinks or merge
//! semantics; it provides the create/read/update/remove contract and the
//! optimistic revision check, nothing more.

use std::{io, path::PathBuf};

use tracing::{debug, error};
use wharf_package::{PackageDocument, DEFAULT_REVISION, METADATA_FILE};
use wharf_utils::{
    error::PathError,
    fs::{ensure_dir_exists, safe_remove},
    name::validate_file_name,
    path::package_dir,
};

use crate::{
    error::{Result, StoreError},
    resource::{create_resource, delete_resource, read_resource, write_resource},
};

pub struct PackageStore {
    root: PathBuf,
}

impl PackageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Directory holding a package's document and tarballs.
    pub fn package_dir(&self, name: &str) -> Result<PathBuf> {
        Ok(package_dir(&self.root, name)?)
    }

    fn document_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.package_dir(name)?.join(METADATA_FILE))
    }

    /// Full path of a tarball file, after validating the file name.
    pub fn tarball_path(&self, name: &str, file: &str) -> Result<PathBuf> {
        if !validate_file_name(file) {
            return Err(StoreError::PathError(PathError::InvalidFileName {
                name: file.to_string(),
            }));
        }
        Ok(self.package_dir(name)?.join(file))
    }

    /// Creates a fresh document for `name`.
    ///
    /// # Errors
    ///
    /// * [`StoreError::AlreadyExists`] if a document is already stored.
    pub fn create_document(&self, name: &str) -> Result<PackageDocument> {
        let path = self.document_path(name)?;
        if let Some(parent) = path.parent() {
            ensure_dir_exists(parent)?;
        }

        let doc = PackageDocument::template(name);
        let bytes = serde_json::to_vec_pretty(&doc)?;

        create_resource(&path, &bytes).map_err(|err| {
            if err.kind() == io::ErrorKind::AlreadyExists {
                StoreError::AlreadyExists {
                    name: name.to_string(),
                }
            } else {
                StoreError::IoError {
                    action: format!("creating document for `{name}`"),
                    source: err,
                }
            }
        })?;

        debug!(package = name, "created package document");
        Ok(doc)
    }

    /// Reads and normalizes a stored document.
    ///
    /// # Errors
    ///
    /// * [`StoreError::NotFound`] if no document is stored under `name`.
    /// * [`StoreError::IoError`] for any other read failure.
    pub fn read_document(&self, name: &str) -> Result<PackageDocument> {
        let path = self.document_path(name)?;

        let bytes = read_resource(&path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound {
                    name: name.to_string(),
                }
            } else {
                error!(package = name, %err, "error reading package document");
                StoreError::IoError {
                    action: format!("reading document for `{name}`"),
                    source: err,
                }
            }
        })?;

        let mut doc: PackageDocument = serde_json::from_slice(&bytes)?;
        doc.normalize();
        Ok(doc)
    }

    /// Reads a document, bootstrapping a template when none is stored.
    ///
    /// This is the read half of the sync path: merging uplink data must
    /// work for packages that have never been published locally.
    pub fn read_or_template(&self, name: &str) -> Result<PackageDocument> {
        match self.read_document(name) {
            Ok(doc) => Ok(doc),
            Err(StoreError::NotFound { .. }) => {
                let mut doc = PackageDocument::template(name);
                doc.normalize();
                Ok(doc)
            }
            Err(err) => Err(err),
        }
    }

    /// The single mutation entry point: read, mutate, stamp, persist.
    ///
    /// `mutate` returns `Ok(true)` to commit, `Ok(false)` to skip the write
    /// (nothing changed), or an error to abort with no write at all. On
    /// commit the revision is stamped (counter incremented, fresh random
    /// suffix) and the document persisted with an optimistic revision
    /// check; a concurrent writer having committed since our read surfaces
    /// as [`StoreError::RevisionMismatch`]. No retry happens here; retry
    /// policy belongs to the caller.
    ///
    /// # Errors
    ///
    /// * [`StoreError::NotFound`] if no document is stored under `name`.
    /// * Whatever error `mutate` returns, unchanged.
    pub fn update_document<E, F>(&self, name: &str, mutate: F) -> std::result::Result<PackageDocument, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut PackageDocument) -> std::result::Result<bool, E>,
    {
        let doc = self.read_document(name).map_err(E::from)?;
        self.mutate_and_persist(name, doc, mutate)
    }

    /// Same protocol as [`Self::update_document`], but bootstraps a
    /// template when no backing resource exists for `name` at all.
    pub fn upsert_document<E, F>(&self, name: &str, mutate: F) -> std::result::Result<PackageDocument, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut PackageDocument) -> std::result::Result<bool, E>,
    {
        let doc = self.read_or_template(name).map_err(E::from)?;
        self.mutate_and_persist(name, doc, mutate)
    }

    fn mutate_and_persist<E, F>(
        &self,
        name: &str,
        mut doc: PackageDocument,
        mutate: F,
    ) -> std::result::Result<PackageDocument, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut PackageDocument) -> std::result::Result<bool, E>,
    {
        let expected_rev = doc.rev.clone();

        if !mutate(&mut doc)? {
            return Ok(doc);
        }

        doc.bump_revision();
        self.persist(name, &doc, &expected_rev).map_err(E::from)?;
        Ok(doc)
    }

    fn persist(&self, name: &str, doc: &PackageDocument, expected_rev: &str) -> Result<()> {
        let path = self.document_path(name)?;

        // Optimistic concurrency check against the stored revision.
        match read_resource(&path) {
            Ok(bytes) => {
                let current: PackageDocument = serde_json::from_slice(&bytes)?;
                if current.rev != expected_rev {
                    return Err(StoreError::RevisionMismatch {
                        name: name.to_string(),
                    });
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                // First write for this package; anything but a pristine
                // template revision means the document vanished under us.
                if expected_rev != DEFAULT_REVISION {
                    return Err(StoreError::RevisionMismatch {
                        name: name.to_string(),
                    });
                }
                if let Some(parent) = path.parent() {
                    ensure_dir_exists(parent)?;
                }
            }
            Err(err) => {
                return Err(StoreError::IoError {
                    action: format!("reading document for `{name}`"),
                    source: err,
                });
            }
        }

        let bytes = serde_json::to_vec_pretty(doc)?;
        write_resource(&path, &bytes).map_err(|err| {
            error!(package = name, %err, "error writing package document");
            StoreError::IoError {
                action: format!("writing document for `{name}`"),
                source: err,
            }
        })?;

        debug!(package = name, rev = %doc.rev, "persisted package document");
        Ok(())
    }

    /// Removes a package: the document record first, then every attachment
    /// file best-effort. Only a failure to delete the document itself is an
    /// error; once that record is gone the removal has committed.
    ///
    /// # Errors
    ///
    /// * [`StoreError::NotFound`] if no document is stored under `name`.
    pub fn remove_document(&self, name: &str) -> Result<()> {
        let doc = self.read_document(name)?;
        let path = self.document_path(name)?;

        delete_resource(&path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound {
                    name: name.to_string(),
                }
            } else {
                StoreError::IoError {
                    action: format!("deleting document for `{name}`"),
                    source: err,
                }
            }
        })?;

        let dir = self.package_dir(name)?;
        for file in doc.attachments.keys() {
            if let Err(err) = safe_remove(dir.join(file)) {
                debug!(package = name, %file, %err, "ignoring attachment delete failure");
            }
        }

        // Drop the directory as well if nothing else is left in it.
        let _ = std::fs::remove_dir(&dir);

        Ok(())
    }
}
