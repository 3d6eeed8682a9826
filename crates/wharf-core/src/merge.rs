//! The metadata merge engine.
//!
//! Folds one validated uplink response into a local package document. The
//! merge is one-directional per call; applying several uplinks means
//! calling this once per uplink in configuration order, which makes the
//! declaration order the deterministic tie-break for tags, readme and
//! time data.

use tracing::debug;
use url::Url;
use wharf_config::UplinkConfig;
use wharf_package::{DistFile, PackageDocument};

/// Merges `remote` (one uplink's validated response) into `local`.
///
/// Rules, in order:
///
/// - A version present locally is never touched; local wins. Versions
///   only present in `remote` are copied in with their readme stripped,
///   and their tarball cached under `_distfiles` (first writer wins, so
///   one filename never mixes origins). When the tarball host matches the
///   uplink host, the stored URL's protocol is rehomed to the uplink's and
///   the uplink recorded as the tarball's registry.
/// - A dist-tag is adopted when absent locally or different; the last
///   uplink processed wins on conflict.
/// - An `_uplinks` cache entry is adopted when missing or when its
///   etag/fetched stamp differ.
/// - `readme` and `time` are overwritten wholesale when the remote value
///   differs at all.
///
/// Returns whether anything changed, so the caller can skip a redundant
/// persist.
pub fn merge_uplink_response(
    local: &mut PackageDocument,
    remote: &PackageDocument,
    uplink: &UplinkConfig,
) -> bool {
    let mut changed = false;

    for (version, record) in &remote.versions {
        if local.versions.contains_key(version) {
            continue;
        }

        let mut record = record.clone();
        record.strip_readme();

        if let Some(file) = record.tarball_file_name().map(String::from) {
            // never overwrite an existing entry for the same filename
            if !local.dist_files.contains_key(&file) {
                let dist = record.dist.as_ref();
                let mut dist_file = DistFile {
                    url: dist
                        .and_then(|d| d.tarball.clone())
                        .unwrap_or_default(),
                    sha: dist.and_then(|d| d.shasum.clone()),
                    registry: None,
                };
                rehome_to_uplink(&mut dist_file, uplink);
                local.dist_files.insert(file, dist_file);
            }
        }

        debug!(package = %local.name, version = %version, uplink = %uplink.name, "adopting remote version");
        local.versions.insert(version.clone(), record);
        changed = true;
    }

    for (tag, value) in &remote.dist_tags {
        if local.dist_tags.get(tag) != Some(value) {
            local.dist_tags.insert(tag.clone(), value.clone());
            changed = true;
        }
    }

    for (id, entry) in &remote.uplink_cache {
        if local.uplink_cache.get(id) != Some(entry) {
            local.uplink_cache.insert(id.clone(), entry.clone());
            changed = true;
        }
    }

    if remote.readme != local.readme {
        local.readme = remote.readme.clone();
        changed = true;
    }

    if !remote.time.is_empty() && remote.time != local.time {
        local.time = remote.time.clone();
        changed = true;
    }

    changed
}

/// Keeps a cached tarball URL on the same protocol as the uplink it came
/// from, and records that uplink as the tarball's registry. Only applies
/// when the tarball actually lives on the uplink's host.
fn rehome_to_uplink(dist_file: &mut DistFile, uplink: &UplinkConfig) {
    let Ok(mut tarball_url) = Url::parse(&dist_file.url) else {
        return;
    };
    let Ok(uplink_url) = Url::parse(&uplink.url) else {
        return;
    };

    if tarball_url.host_str().is_some() && tarball_url.host_str() == uplink_url.host_str() {
        let _ = tarball_url.set_scheme(uplink_url.scheme());
        dist_file.url = tarball_url.to_string();
        dist_file.registry = Some(uplink.name.clone());
    }
}

#[cfg(test)]
mod tests {
    use wharf_package::{DistInfo, TagValue, VersionRecord};

    use super::*;

    fn uplink(name: &str, url: &str) -> UplinkConfig {
        UplinkConfig {
            name: name.to_string(),
            url: url.to_string(),
            max_age: None,
            timeout: None,
        }
    }

    fn version_with_tarball(tarball: &str, shasum: &str) -> VersionRecord {
        VersionRecord {
            dist: Some(DistInfo {
                tarball: Some(tarball.to_string()),
                shasum: Some(shasum.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_local_version_wins() {
        let mut local = PackageDocument::template("pkg");
        local.versions.insert(
            "1.0.0".to_string(),
            VersionRecord {
                description: Some("local copy".to_string()),
                ..Default::default()
            },
        );

        let mut remote = PackageDocument::template("pkg");
        remote.versions.insert(
            "1.0.0".to_string(),
            VersionRecord {
                description: Some("remote copy".to_string()),
                ..Default::default()
            },
        );
        remote
            .versions
            .insert("2.0.0".to_string(), VersionRecord::default());

        let changed = merge_uplink_response(
            &mut local,
            &remote,
            &uplink("upstream", "https://registry.example.org"),
        );

        assert!(changed);
        assert_eq!(
            local.versions["1.0.0"].description.as_deref(),
            Some("local copy")
        );
        assert!(local.versions.contains_key("2.0.0"));
    }

    #[test]
    fn test_remote_readme_is_stripped_from_versions() {
        let mut local = PackageDocument::template("pkg");
        let mut remote = PackageDocument::template("pkg");
        remote.versions.insert(
            "1.0.0".to_string(),
            VersionRecord {
                readme: Some("# huge readme".to_string()),
                ..Default::default()
            },
        );

        merge_uplink_response(
            &mut local,
            &remote,
            &uplink("upstream", "https://registry.example.org"),
        );

        assert!(local.versions["1.0.0"].readme.is_none());
    }

    #[test]
    fn test_dist_files_first_writer_wins() {
        let up_a = uplink("a", "https://a.example.org");
        let up_b = uplink("b", "https://b.example.org");

        let mut local = PackageDocument::template("pkg");

        let mut remote_a = PackageDocument::template("pkg");
        remote_a.versions.insert(
            "1.0.0".to_string(),
            version_with_tarball("https://a.example.org/pkg/-/pkg-1.0.0.tgz", "sha-a"),
        );
        merge_uplink_response(&mut local, &remote_a, &up_a);

        // same filename from a different uplink on a later version
        let mut remote_b = PackageDocument::template("pkg");
        remote_b.versions.insert(
            "1.0.0".to_string(),
            version_with_tarball("https://b.example.org/pkg/-/pkg-1.0.0.tgz", "sha-b"),
        );
        remote_b.versions.insert(
            "1.1.0".to_string(),
            version_with_tarball("https://b.example.org/pkg/-/pkg-1.0.0.tgz", "sha-b"),
        );
        merge_uplink_response(&mut local, &remote_b, &up_b);

        let dist_file = &local.dist_files["pkg-1.0.0.tgz"];
        assert_eq!(dist_file.sha.as_deref(), Some("sha-a"));
        assert_eq!(dist_file.registry.as_deref(), Some("a"));
    }

    #[test]
    fn test_protocol_rehoming_on_host_match() {
        let up = uplink("upstream", "https://registry.example.org");

        let mut local = PackageDocument::template("pkg");
        let mut remote = PackageDocument::template("pkg");
        remote.versions.insert(
            "1.0.0".to_string(),
            version_with_tarball("http://registry.example.org/pkg/-/pkg-1.0.0.tgz", "sha"),
        );

        merge_uplink_response(&mut local, &remote, &up);

        let dist_file = &local.dist_files["pkg-1.0.0.tgz"];
        assert!(dist_file.url.starts_with("https://registry.example.org/"));
        assert_eq!(dist_file.registry.as_deref(), Some("upstream"));
    }

    #[test]
    fn test_foreign_host_is_left_alone() {
        let up = uplink("upstream", "https://registry.example.org");

        let mut local = PackageDocument::template("pkg");
        let mut remote = PackageDocument::template("pkg");
        remote.versions.insert(
            "1.0.0".to_string(),
            version_with_tarball("http://cdn.elsewhere.net/pkg-1.0.0.tgz", "sha"),
        );

        merge_uplink_response(&mut local, &remote, &up);

        let dist_file = &local.dist_files["pkg-1.0.0.tgz"];
        assert_eq!(dist_file.url, "http://cdn.elsewhere.net/pkg-1.0.0.tgz");
        assert!(dist_file.registry.is_none());
    }

    #[test]
    fn test_last_uplink_wins_on_tags() {
        let up_a = uplink("a", "https://a.example.org");
        let up_b = uplink("b", "https://b.example.org");

        let mut local = PackageDocument::template("pkg");

        let mut remote_a = PackageDocument::template("pkg");
        remote_a
            .versions
            .insert("1.0.0".to_string(), VersionRecord::default());
        remote_a.dist_tags.insert(
            "latest".to_string(),
            TagValue::Version("1.0.0".to_string()),
        );

        let mut remote_b = PackageDocument::template("pkg");
        remote_b
            .versions
            .insert("2.0.0".to_string(), VersionRecord::default());
        remote_b.dist_tags.insert(
            "latest".to_string(),
            TagValue::Version("2.0.0".to_string()),
        );

        merge_uplink_response(&mut local, &remote_a, &up_a);
        merge_uplink_response(&mut local, &remote_b, &up_b);

        assert_eq!(local.tag("latest"), Some("2.0.0"));
    }

    #[test]
    fn test_unchanged_merge_reports_false() {
        let up = uplink("upstream", "https://registry.example.org");

        let mut local = PackageDocument::template("pkg");
        let mut remote = PackageDocument::template("pkg");
        remote
            .versions
            .insert("1.0.0".to_string(), VersionRecord::default());

        assert!(merge_uplink_response(&mut local, &remote, &up));
        // applying the identical response again changes nothing
        assert!(!merge_uplink_response(&mut local, &remote, &up));
    }

    #[test]
    fn test_time_and_readme_overwritten_wholesale() {
        let up = uplink("upstream", "https://registry.example.org");

        let mut local = PackageDocument::template("pkg");
        local
            .time
            .insert("created".to_string(), "2020-01-01T00:00:00.000Z".to_string());
        local.readme = Some("old".to_string());

        let mut remote = PackageDocument::template("pkg");
        remote
            .time
            .insert("created".to_string(), "2021-01-01T00:00:00.000Z".to_string());
        remote
            .time
            .insert("modified".to_string(), "2021-06-01T00:00:00.000Z".to_string());
        remote.readme = Some("new".to_string());

        assert!(merge_uplink_response(&mut local, &remote, &up));
        assert_eq!(local.readme.as_deref(), Some("new"));
        assert_eq!(local.time.len(), 2);
        assert_eq!(
            local.time["modified"],
            "2021-06-01T00:00:00.000Z".to_string()
        );
    }

    #[test]
    fn test_uplink_cache_adopted_when_different() {
        let up = uplink("upstream", "https://registry.example.org");

        let mut local = PackageDocument::template("pkg");
        let mut remote = PackageDocument::template("pkg");
        remote.uplink_cache.insert(
            "upstream".to_string(),
            wharf_package::UplinkCacheEntry {
                etag: Some("\"v1\"".to_string()),
                fetched: Some(1000),
            },
        );

        assert!(merge_uplink_response(&mut local, &remote, &up));
        assert!(!merge_uplink_response(&mut local, &remote, &up));
        assert_eq!(
            local.uplink_cache["upstream"].etag.as_deref(),
            Some("\"v1\"")
        );
    }
}
