//! The storage facade.
//!
//! Sequences the document store, the uplink clients and the merge engine
//! to answer the operations the transport layer exposes: metadata reads
//! (local + uplinks), publishes, version/tag updates, unpublishes and
//! tarball transfers. Each package name is an independent unit; nothing
//! here locks across packages, and all persistence goes through the
//! store's optimistic update protocol.

use std::{collections::BTreeMap, sync::Arc};

use tracing::{debug, info, warn};
use wharf_config::Config;
use wharf_package::{
    tag_version, validate_metadata, PackageDocument, UplinkCacheEntry, VersionRecord,
};
use wharf_store::{PackageStore, StoreError, TarballReader, TarballWriter};
use wharf_uplink::{FetchOutcome, Uplink, UplinkError};
use wharf_utils::{fs::safe_remove, name::validate_package_name, time::iso8601_now};

use crate::{
    error::{Result, WharfError},
    merge::merge_uplink_response,
    tarball::TarballUpload,
};

pub struct Storage {
    config: Arc<Config>,
    store: PackageStore,
    uplinks: Vec<Uplink>,
}

impl Storage {
    /// Builds the facade from a loaded configuration. Uplink clients are
    /// created in declaration order; that order is the merge priority.
    pub fn new(config: Arc<Config>) -> Self {
        let store = PackageStore::new(config.storage.clone());
        let uplinks = config.uplinks.iter().cloned().map(Uplink::new).collect();

        Self {
            config,
            store,
            uplinks,
        }
    }

    pub fn store(&self) -> &PackageStore {
        &self.store
    }

    /// Answers a metadata read: local document (template when wholly new)
    /// merged with every configured uplink in declared order.
    ///
    /// Uplink failures are collected, not fatal; the read only fails when
    /// the package exists neither locally nor on any reachable uplink:
    /// [`WharfError::PackageNotFound`] when every uplink denied knowing
    /// it, [`WharfError::Unavailable`] when an uplink could not be asked.
    /// When any merge changed the document the result is persisted once
    /// through the update protocol.
    pub fn get_package(&self, name: &str) -> Result<PackageDocument> {
        let (doc, locally_present) = match self.store.read_document(name) {
            Ok(doc) => (doc, true),
            Err(StoreError::NotFound { .. }) => {
                let mut template = PackageDocument::template(name);
                template.normalize();
                (template, false)
            }
            Err(err) => return Err(err.into()),
        };

        let mut outcomes: Vec<(usize, FetchOutcome)> = Vec::new();
        let mut failures: Vec<UplinkError> = Vec::new();

        for (idx, uplink) in self.uplinks.iter().enumerate() {
            let cache = doc.uplink_cache.get(uplink.name()).cloned();
            match uplink.fetch_metadata(name, cache.as_ref(), false) {
                Ok(outcome) => outcomes.push((idx, outcome)),
                Err(err) => {
                    if err.is_not_found() {
                        debug!(uplink = uplink.name(), package = name, "not on uplink");
                    } else {
                        warn!(uplink = uplink.name(), package = name, %err, "uplink fetch failed");
                    }
                    failures.push(err);
                }
            }
        }

        if !locally_present && outcomes.is_empty() {
            if failures.iter().any(|err| !err.is_not_found()) {
                return Err(WharfError::Unavailable(format!(
                    "no uplink could be reached for `{name}`"
                )));
            }
            return Err(WharfError::PackageNotFound(name.to_string()));
        }

        let mut working = doc.clone();
        let changed = self.apply_outcomes(&mut working, &outcomes);

        if changed {
            // Re-apply against a fresh read inside the update protocol so a
            // racing writer's work is never clobbered.
            working = self
                .store
                .upsert_document::<WharfError, _>(name, |fresh| {
                    Ok(self.apply_outcomes(fresh, &outcomes))
                })?;
        }

        working.normalize();
        Ok(working)
    }

    fn apply_outcomes(
        &self,
        doc: &mut PackageDocument,
        outcomes: &[(usize, FetchOutcome)],
    ) -> bool {
        let mut changed = false;

        for (idx, outcome) in outcomes {
            let uplink = &self.uplinks[*idx];
            match outcome {
                FetchOutcome::NotModified { refreshed: None } => {}
                FetchOutcome::NotModified {
                    refreshed: Some(fetched),
                } => {
                    let entry = doc
                        .uplink_cache
                        .entry(uplink.name().to_string())
                        .or_default();
                    if entry.fetched != Some(*fetched) {
                        entry.fetched = Some(*fetched);
                        changed = true;
                    }
                }
                FetchOutcome::Fresh {
                    document,
                    etag,
                    fetched,
                } => {
                    let entry = UplinkCacheEntry {
                        etag: etag.clone(),
                        fetched: Some(*fetched),
                    };
                    if doc.uplink_cache.get(uplink.name()) != Some(&entry) {
                        doc.uplink_cache.insert(uplink.name().to_string(), entry);
                        changed = true;
                    }

                    if merge_uplink_response(doc, document, uplink.config()) {
                        changed = true;
                    }
                }
            }
        }

        changed
    }

    /// Publishes a brand-new package.
    ///
    /// The metadata must describe `name`, and the package must exist
    /// neither locally nor on any uplink. An uplink that cannot be asked
    /// refuses the publish unless the configuration allows offline
    /// publishing.
    pub fn add_package(&self, name: &str, metadata: &PackageDocument) -> Result<()> {
        if !validate_package_name(name) {
            return Err(WharfError::Validation(format!(
                "invalid package name `{name}`"
            )));
        }
        validate_metadata(metadata, name)?;

        match self.store.read_document(name) {
            Ok(_) => {
                return Err(WharfError::Conflict(
                    "this package is already present".to_string(),
                ))
            }
            Err(StoreError::NotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }

        for uplink in &self.uplinks {
            match uplink.fetch_metadata(name, None, true) {
                Ok(FetchOutcome::Fresh { .. }) | Ok(FetchOutcome::NotModified { .. }) => {
                    return Err(WharfError::Conflict(
                        "this package is already present".to_string(),
                    ));
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => {
                    if self.config.publish.allow_offline() {
                        warn!(uplink = uplink.name(), package = name, %err, "uplink check skipped, offline publish allowed");
                    } else {
                        return Err(WharfError::Unavailable(
                            "one of the uplinks is down, refusing to publish".to_string(),
                        ));
                    }
                }
            }
        }

        self.store.create_document(name)?;
        info!(package = name, "created new package");
        Ok(())
    }

    /// Adds one version to an existing package, optionally pointing a tag
    /// at it.
    ///
    /// The version's readme moves to the package level, a duplicate
    /// version is a conflict, and a declared tarball shasum that differs
    /// from the stored attachment's digest fails validation.
    pub fn add_version(
        &self,
        name: &str,
        version: &str,
        mut record: VersionRecord,
        tag: Option<&str>,
    ) -> Result<()> {
        let version = version.to_string();

        self.store.update_document::<WharfError, _>(name, |doc| {
            if record.readme.is_some() {
                doc.readme = record.readme.clone();
            }
            record.strip_readme();

            if doc.versions.contains_key(&version) {
                return Err(WharfError::Conflict(
                    "this version is already present".to_string(),
                ));
            }

            if let Some(file) = record.tarball_file_name().map(String::from) {
                if let Some(attachment) = doc.attachments.get_mut(&file) {
                    let declared = record
                        .dist
                        .as_ref()
                        .and_then(|dist| dist.shasum.as_deref());
                    if let Some(declared) = declared {
                        if attachment.shasum != declared {
                            return Err(WharfError::Validation(format!(
                                "shasum error, {} != {}",
                                attachment.shasum, declared
                            )));
                        }
                    }

                    let now = iso8601_now();
                    doc.time.insert("modified".to_string(), now.clone());
                    doc.time
                        .entry("created".to_string())
                        .or_insert_with(|| now.clone());
                    doc.time.insert(version.clone(), now);

                    attachment.version = Some(version.clone());
                }
            }

            doc.versions.insert(version.clone(), record.clone());

            if let Some(tag) = tag {
                tag_version(doc, &version, tag);
            }

            Ok(true)
        })?;

        info!(package = name, version = %version, "published version");
        Ok(())
    }

    /// Merges a map of tag updates into a package. A `None` value removes
    /// the tag; tagging a version the package doesn't have is an error.
    pub fn merge_tags(&self, name: &str, tags: &BTreeMap<String, Option<String>>) -> Result<()> {
        self.store.update_document::<WharfError, _>(name, |doc| {
            for (tag, value) in tags {
                match value {
                    None => {
                        doc.dist_tags.remove(tag);
                    }
                    Some(version) => {
                        if !doc.versions.contains_key(version) {
                            return Err(WharfError::VersionNotFound {
                                package: doc.name.clone(),
                                version: version.clone(),
                            });
                        }
                        tag_version(doc, version, tag);
                    }
                }
            }
            Ok(true)
        })?;

        Ok(())
    }

    /// Unpublish semantics: every local version absent from the caller's
    /// target set is removed and its attachment association detached; the
    /// dist-tags are replaced wholesale. Tarball bytes are never deleted
    /// here; physical removal is the separate [`Self::remove_tarball`].
    pub fn change_package(&self, name: &str, incoming: &PackageDocument) -> Result<()> {
        validate_metadata(incoming, name)?;

        self.store.update_document::<WharfError, _>(name, |doc| {
            let removed: Vec<String> = doc
                .versions
                .keys()
                .filter(|version| !incoming.versions.contains_key(*version))
                .cloned()
                .collect();

            for version in &removed {
                info!(package = name, version = %version, "unpublishing version");
                doc.versions.remove(version);

                for attachment in doc.attachments.values_mut() {
                    if attachment.version.as_deref() == Some(version.as_str()) {
                        attachment.version = None;
                    }
                }
            }

            doc.dist_tags = incoming.dist_tags.clone();
            Ok(true)
        })?;

        Ok(())
    }

    /// Removes a package entirely: the document record and every
    /// attachment file.
    pub fn remove_package(&self, name: &str) -> Result<()> {
        self.store.remove_document(name)?;
        info!(package = name, "package removed");
        Ok(())
    }

    /// Physically removes one tarball: detaches the attachment record
    /// through the update protocol, then deletes the file.
    ///
    /// # Errors
    ///
    /// * [`WharfError::Store`] with a not-found kind if the package or the
    ///   attachment doesn't exist.
    pub fn remove_tarball(&self, name: &str, file: &str) -> Result<()> {
        let file = file.to_string();

        self.store.update_document::<WharfError, _>(name, |doc| {
            if doc.attachments.remove(&file).is_none() {
                return Err(WharfError::Store(StoreError::FileNotFound {
                    file: file.clone(),
                }));
            }
            Ok(true)
        })?;

        let path = self.store.tarball_path(name, &file)?;
        if let Err(err) = safe_remove(&path) {
            warn!(package = name, file = %file, %err, "failed to delete tarball file");
        }

        info!(package = name, file = %file, "tarball removed");
        Ok(())
    }

    /// Opens an upload stream for a new tarball.
    ///
    /// Reserved and invalid names are rejected before any byte is
    /// accepted, and a filename that already exists is a conflict.
    pub fn add_tarball(&self, name: &str, file: &str) -> Result<TarballUpload<'_>> {
        if !validate_package_name(name) {
            return Err(WharfError::Validation(format!(
                "invalid package name `{name}`"
            )));
        }

        let path = self.store.tarball_path(name, file)?;
        let writer = TarballWriter::create(path)?;

        Ok(TarballUpload::new(
            &self.store,
            name.to_string(),
            file.to_string(),
            writer,
        ))
    }

    /// Opens a download stream for a stored tarball. The reader knows its
    /// content length before the first byte is read.
    pub fn get_tarball(&self, name: &str, file: &str) -> Result<TarballReader> {
        let path = self.store.tarball_path(name, file)?;
        Ok(TarballReader::open(path)?)
    }

    /// Rewrites every version's tarball URL to point at this server:
    /// `{base}/{name}/-/{file}`, with the `/` of a scoped name encoded.
    /// A configured `url_prefix` overrides or extends the caller-supplied
    /// base.
    pub fn rewrite_tarball_urls(&self, doc: &mut PackageDocument, base: &str) {
        let base = base.trim_end_matches('/');
        let base = match self.config.url_prefix.as_deref() {
            Some(prefix) => {
                let prefix = prefix.trim_end_matches('/');
                if prefix.starts_with('/') {
                    format!("{base}{prefix}")
                } else {
                    prefix.to_string()
                }
            }
            None => base.to_string(),
        };

        let encoded_name = doc.name.replace('/', "%2f");

        for record in doc.versions.values_mut() {
            let Some(file) = record.tarball_file_name().map(String::from) else {
                continue;
            };
            if let Some(dist) = record.dist.as_mut() {
                dist.tarball = Some(format!("{base}/{encoded_name}/-/{file}"));
            }
        }
    }
}
