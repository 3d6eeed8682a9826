//! The per-package metadata document and its embedded records.
//!
//! One document exists per package name; it is the unit of consistency for
//! the whole registry. The serialized shape stays compatible with the
//! registry wire format: `dist-tags`, `_distfiles`, `_attachments`,
//! `_uplinks` and `_rev` keep their legacy key names.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File name of the document resource inside a package's storage directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Revision stamp assigned to a document that has never been persisted.
pub const DEFAULT_REVISION: &str = "0-0000000000000000";

/// A dist-tag value.
///
/// The wire format stores one version string per tag, but legacy documents
/// may carry a list of versions. [`crate::version::normalize_dist_tags`]
/// collapses the legacy form to the single highest valid version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Version(String),
    Legacy(Vec<String>),
}

/// `dist` block of a published version: where the tarball lives and its
/// integrity digest. Unknown keys round-trip through `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tarball: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shasum: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One published version's manifest.
///
/// Only the fields the engine inspects are typed; the remaining manifest
/// content (dependencies, author, scripts, ...) flows through `manifest`
/// losslessly. A stored version record never carries a `readme`: readmes
/// are kept once per package and stripped from versions on every merge and
/// publish.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist: Option<DistInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,

    #[serde(flatten)]
    pub manifest: Map<String, Value>,
}

impl VersionRecord {
    /// Drops the per-version readme. Returns whether anything was removed.
    pub fn strip_readme(&mut self) -> bool {
        self.readme.take().is_some()
    }

    /// File name component of this version's tarball URL, if any.
    pub fn tarball_file_name(&self) -> Option<&str> {
        self.dist
            .as_ref()
            .and_then(|dist| dist.tarball.as_deref())
            .and_then(|url| url.rsplit('/').next())
            .filter(|name| !name.is_empty())
    }
}

/// A stored tarball associated with the package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub shasum: String,

    /// Back-filled once the version referencing this tarball is published.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A remote tarball known from an uplink, cached under its file name.
///
/// `registry` names the uplink the bytes should be fetched from; it is set
/// when the tarball host matches the uplink host and the stored protocol is
/// rehomed to the uplink's.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistFile {
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
}

/// Per-uplink conditional-fetch cache: the etag of the last response and
/// when it was fetched (epoch milliseconds).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UplinkCacheEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched: Option<u64>,
}

/// The package metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDocument {
    pub name: String,

    #[serde(default)]
    pub versions: BTreeMap<String, VersionRecord>,

    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, TagValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,

    #[serde(default)]
    pub time: BTreeMap<String, String>,

    #[serde(rename = "_distfiles", default)]
    pub dist_files: BTreeMap<String, DistFile>,

    #[serde(rename = "_attachments", default)]
    pub attachments: BTreeMap<String, AttachmentRecord>,

    #[serde(rename = "_uplinks", default)]
    pub uplink_cache: BTreeMap<String, UplinkCacheEntry>,

    #[serde(rename = "_rev", default)]
    pub rev: String,
}

impl PackageDocument {
    /// Fresh document template for a package that has never been stored.
    pub fn template(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: BTreeMap::new(),
            dist_tags: BTreeMap::new(),
            readme: None,
            time: BTreeMap::new(),
            dist_files: BTreeMap::new(),
            attachments: BTreeMap::new(),
            uplink_cache: BTreeMap::new(),
            rev: DEFAULT_REVISION.to_string(),
        }
    }

    /// Repairs document properties after a read: missing revision stamps
    /// default, dist-tags are normalized (legacy lists collapsed, invalid
    /// entries dropped, `latest` repaired).
    pub fn normalize(&mut self) {
        if self.rev.is_empty() {
            self.rev = DEFAULT_REVISION.to_string();
        }

        crate::version::normalize_dist_tags(self);
    }

    /// Resolved value of a dist-tag, ignoring un-normalized legacy lists.
    pub fn tag(&self, tag: &str) -> Option<&str> {
        match self.dist_tags.get(tag) {
            Some(TagValue::Version(version)) => Some(version.as_str()),
            _ => None,
        }
    }

    /// Numeric prefix of the revision stamp. Malformed stamps count as 0.
    pub fn rev_counter(&self) -> u64 {
        self.rev
            .split('-')
            .next()
            .and_then(|counter| counter.parse().ok())
            .unwrap_or(0)
    }

    /// Stamps a new revision: the counter is incremented and the random
    /// suffix regenerated. Called on every successful mutation before the
    /// document is persisted.
    pub fn bump_revision(&mut self) {
        let suffix: [u8; 8] = rand::rng().random();
        self.rev = format!("{}-{}", self.rev_counter() + 1, hex::encode(suffix));
    }
}
