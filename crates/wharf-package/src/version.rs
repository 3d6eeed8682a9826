//! Pure version and dist-tag utilities.
//!
//! Ordering and comparison are delegated to the `semver` crate, with a
//! lenient parse on top so user-supplied tokens like `1.0` or `v1.2.3`
//! match the strict `1.0.0` / `1.2.3` keys a document stores. Invalid
//! version strings are never an error here: they are dropped from sorts and
//! tag updates with a warning, because a single bad version published years
//! ago must not make a whole package unreadable.

use std::cmp::Ordering;

use semver::Version;
use tracing::warn;

use crate::document::{PackageDocument, TagValue, VersionRecord};

/// Parses a version string, tolerating the shorthand forms the strict
/// `semver` grammar rejects: a leading `v` or `=`, and missing minor/patch
/// components (`1` and `1.0` both parse as `1.0.0`).
pub fn parse_lenient(input: &str) -> Option<Version> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix(['v', '='])
        .unwrap_or(trimmed);

    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    // Pad a bare "1" or "1.2" core, keeping any -pre/+build suffix.
    let (core, suffix) = match trimmed.find(['-', '+']) {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };

    let all_numeric = core
        .split('.')
        .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));
    if !all_numeric {
        return None;
    }

    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0{suffix}"),
        2 => format!("{core}.0{suffix}"),
        _ => return None,
    };

    Version::parse(&padded).ok()
}

/// Compares two version strings by semver precedence.
///
/// Returns `None` when either side fails to parse; invalid versions are
/// excluded from ordering rather than treated as errors.
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    Some(parse_lenient(a)?.cmp(&parse_lenient(b)?))
}

/// Sorts the valid versions of `versions` in ascending semver order.
///
/// Invalid entries are dropped with a warning.
pub fn sort_valid_versions<I, S>(versions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut valid: Vec<(Version, String)> = versions
        .into_iter()
        .filter_map(|version| {
            let version = version.as_ref();
            match parse_lenient(version) {
                Some(parsed) => Some((parsed, version.to_string())),
                None => {
                    warn!(version, "ignoring bad version");
                    None
                }
            }
        })
        .collect();

    valid.sort_by(|a, b| a.0.cmp(&b.0));
    valid.into_iter().map(|(_, version)| version).collect()
}

fn lookup_version<'a>(doc: &'a PackageDocument, token: &str) -> Option<&'a VersionRecord> {
    if let Some(record) = doc.versions.get(token) {
        return Some(record);
    }

    // Non-strict match: "1.0" finds the stored "1.0.0".
    let wanted = parse_lenient(token)?;
    doc.versions
        .iter()
        .find(|(key, _)| parse_lenient(key).is_some_and(|parsed| parsed == wanted))
        .map(|(_, record)| record)
}

/// Resolves a user-supplied token against a document.
///
/// Tries an exact version key first, then a lenient semver-equivalent
/// match, then a dist-tag indirection. Returns `None` if nothing resolves.
pub fn resolve_version<'a>(doc: &'a PackageDocument, token: &str) -> Option<&'a VersionRecord> {
    if let Some(record) = lookup_version(doc, token) {
        return Some(record);
    }

    let tagged = doc.tag(token)?;
    lookup_version(doc, tagged)
}

/// Points `tag` at `version` if the version parses as valid semver.
///
/// An invalid version leaves the tags unchanged and only logs a warning;
/// tagging is never a fatal operation. Returns whether the tag was set.
pub fn tag_version(doc: &mut PackageDocument, version: &str, tag: &str) -> bool {
    if tag.is_empty() {
        return false;
    }

    if parse_lenient(version).is_none() {
        warn!(version, tag, "ignoring bad version for tag");
        return false;
    }

    doc.dist_tags
        .insert(tag.to_string(), TagValue::Version(version.to_string()));
    true
}

/// Repairs a document's dist-tags in place.
///
/// Legacy list values collapse to their single highest valid version (or
/// the tag is removed when none is valid), string values that fail semver
/// parsing are removed, and `latest` is recomputed from the highest stored
/// version whenever it is absent or does not reference a stored version.
/// Applying this twice yields the same document as applying it once.
pub fn normalize_dist_tags(doc: &mut PackageDocument) {
    let tags = std::mem::take(&mut doc.dist_tags);

    for (tag, value) in tags {
        match value {
            TagValue::Version(version) => {
                if parse_lenient(&version).is_some() {
                    doc.dist_tags.insert(tag, TagValue::Version(version));
                } else {
                    warn!(%tag, %version, "removing tag with invalid version");
                }
            }
            TagValue::Legacy(list) => match sort_valid_versions(&list).pop() {
                Some(highest) => {
                    doc.dist_tags.insert(tag, TagValue::Version(highest));
                }
                None => warn!(%tag, "removing tag with no valid versions"),
            },
        }
    }

    if !doc.versions.is_empty() {
        let latest_resolves = doc
            .tag("latest")
            .is_some_and(|version| doc.versions.contains_key(version));

        if !latest_resolves {
            if let Some(highest) = sort_valid_versions(doc.versions.keys()).pop() {
                doc.dist_tags
                    .insert("latest".to_string(), TagValue::Version(highest));
            }
        }
    }
}
