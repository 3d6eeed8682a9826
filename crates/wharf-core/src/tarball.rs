//! The tarball transfer pipeline.
//!
//! An upload streams bytes into the store while a SHA-1 digest and byte
//! count accumulate alongside. Finishing with zero bytes received is a
//! hard failure that releases the partial write; finishing with data
//! commits the file and then records the attachment (with its verified
//! digest) through the document update protocol. Nothing is ever recorded
//! for an aborted transfer.

use tracing::debug;
use wharf_package::AttachmentRecord;
use wharf_store::{PackageStore, TarballWriter};
use wharf_utils::hash::Sha1Digest;

use crate::error::{Result, WharfError};

/// An in-flight tarball upload.
pub struct TarballUpload<'a> {
    store: &'a PackageStore,
    package: String,
    file: String,
    writer: Option<TarballWriter>,
    digest: Sha1Digest,
}

impl<'a> std::fmt::Debug for TarballUpload<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarballUpload")
            .field("package", &self.package)
            .field("file", &self.file)
            .finish()
    }
}

impl<'a> TarballUpload<'a> {
    pub(crate) fn new(
        store: &'a PackageStore,
        package: String,
        file: String,
        writer: TarballWriter,
    ) -> Self {
        Self {
            store,
            package,
            file,
            writer: Some(writer),
            digest: Sha1Digest::new(),
        }
    }

    /// Appends a chunk: bytes go to the backing file, the digest and byte
    /// count are updated.
    pub fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            WharfError::Validation("upload already finished".to_string())
        })?;

        std::io::Write::write_all(writer, chunk).map_err(|err| WharfError::IoError {
            action: format!("writing tarball `{}`", self.file),
            source: err,
        })?;

        self.digest.update(chunk);
        Ok(())
    }

    /// Bytes received so far.
    pub fn bytes_written(&self) -> u64 {
        self.digest.length()
    }

    /// Abandons the upload and releases the partial backing file. No
    /// attachment record is created.
    pub fn abort(mut self) {
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
        debug!(package = %self.package, file = %self.file, "tarball upload aborted");
    }

    /// Completes the upload: commits the backing file and records the
    /// attachment digest in the package document.
    ///
    /// Returns the hex-encoded SHA-1 shasum of the stored bytes.
    ///
    /// # Errors
    ///
    /// * [`WharfError::Validation`] if zero bytes were received; the
    ///   partial write is released.
    /// * [`WharfError::Store`] if the file commit or the document update
    ///   fails (e.g. the package does not exist).
    pub fn finish(mut self) -> Result<String> {
        let writer = self.writer.take().ok_or_else(|| {
            WharfError::Validation("upload already finished".to_string())
        })?;

        if self.digest.length() == 0 {
            writer.abort();
            return Err(WharfError::Validation(
                "refusing to accept zero-length file".to_string(),
            ));
        }

        let digest = std::mem::take(&mut self.digest);
        let shasum = digest.finalize_hex();

        writer.commit()?;

        let file = self.file.clone();
        let recorded = shasum.clone();
        self.store
            .update_document::<WharfError, _>(&self.package, move |doc| {
                doc.attachments.insert(
                    file,
                    AttachmentRecord {
                        shasum: recorded,
                        version: None,
                    },
                );
                Ok(true)
            })?;

        debug!(
            package = %self.package,
            file = %self.file,
            %shasum,
            "tarball stored"
        );

        Ok(shasum)
    }
}
