//! Package metadata document model for the wharf registry.
//!
//! This crate defines the unit of consistency for the whole registry: the
//! per-package [`PackageDocument`], with its version records, dist-tags,
//! attachment map and per-uplink fetch cache. It also provides the pure
//! version/tag utilities everything above it is built on: semver ordering
//! with lenient parsing, tag normalization and repair, and version
//! resolution from user-supplied tokens.

pub mod document;
pub mod error;
pub mod validate;
pub mod version;

pub use document::{
    AttachmentRecord, DistFile, DistInfo, PackageDocument, TagValue, UplinkCacheEntry,
    VersionRecord, DEFAULT_REVISION, METADATA_FILE,
};
pub use error::{PackageError, Result};
pub use validate::validate_metadata;
pub use version::{
    compare_versions, normalize_dist_tags, parse_lenient, resolve_version, sort_valid_versions,
    tag_version,
};
