//! Conditional metadata fetching from one upstream registry.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::debug;
use ureq::{
    http::{
        header::{CACHE_CONTROL, ETAG, IF_NONE_MATCH, PRAGMA},
        StatusCode,
    },
    Agent,
};
use url::Url;
use wharf_config::UplinkConfig;
use wharf_package::{validate_metadata, PackageDocument, UplinkCacheEntry};
use wharf_utils::time::epoch_ms_now;

use crate::{
    error::{Result, UplinkError},
    http_client::ClientConfig,
};

// A package name must stay one path segment; "/" in scoped names is
// percent-encoded along with the characters that would break the URL.
const PACKAGE_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'/')
    .add(b'%')
    .add(b'?')
    .add(b'#');

/// Result of asking an uplink for package metadata.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Cached data is still valid. `refreshed` carries the new `fetched`
    /// stamp when an actual 304 round-trip confirmed freshness (as opposed
    /// to the staleness window short-circuiting before any network call).
    NotModified { refreshed: Option<u64> },

    /// Fresh metadata was fetched and validated.
    Fresh {
        document: PackageDocument,
        etag: Option<String>,
        fetched: u64,
    },
}

/// Client for one configured upstream registry.
pub struct Uplink {
    config: UplinkConfig,
    agent: Agent,
}

impl Uplink {
    pub fn new(config: UplinkConfig) -> Self {
        let client = ClientConfig {
            timeout: Some(Duration::from_millis(config.timeout_ms() as u64)),
            ..Default::default()
        };

        Self {
            agent: client.build(),
            config,
        }
    }

    /// Identifier of this uplink; key of the document's `_uplinks` cache.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &UplinkConfig {
        &self.config
    }

    fn package_url(&self, name: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url(),
            utf8_percent_encode(name, PACKAGE_SEGMENT)
        )
    }

    /// Fetches package metadata, honoring the staleness window and the
    /// stored ETag.
    ///
    /// Within the uplink's `max_age` window this returns
    /// [`FetchOutcome::NotModified`] without touching the network. Outside
    /// it, a conditional request is issued; an HTTP 304 refreshes the
    /// `fetched` stamp only. A fresh body must pass
    /// [`validate_metadata`] before it is returned.
    ///
    /// # Errors
    ///
    /// * [`UplinkError::NotFound`] if the uplink answers 404; the uplink
    ///   simply doesn't carry this package.
    /// * [`UplinkError::RemoteStatus`] for any other non-2xx answer.
    /// * [`UplinkError::FailedToFetch`] for transport failures.
    /// * [`UplinkError::Validation`] if the body does not describe `name`.
    pub fn fetch_metadata(
        &self,
        name: &str,
        cache: Option<&UplinkCacheEntry>,
        force: bool,
    ) -> Result<FetchOutcome> {
        if !force {
            if let Some(fetched) = cache.and_then(|entry| entry.fetched) {
                let age = epoch_ms_now().saturating_sub(fetched) as u128;
                if age < self.config.max_age_ms() {
                    debug!(uplink = self.name(), package = name, "metadata still fresh");
                    return Ok(FetchOutcome::NotModified { refreshed: None });
                }
            }
        }

        Url::parse(&self.config.url)
            .map_err(|err| UplinkError::InvalidUrl(err.to_string()))?;

        let url = self.package_url(name);
        debug!(uplink = self.name(), package = name, %url, "fetching metadata");

        let mut req = self
            .agent
            .get(&url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache");

        if let Some(etag) = cache.and_then(|entry| entry.etag.as_deref()) {
            req = req.header(IF_NONE_MATCH, etag);
        }

        let resp = req.call().map_err(|err| UplinkError::FailedToFetch {
            uplink: self.name().to_string(),
            reason: err.to_string(),
        })?;

        if resp.status() == StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::NotModified {
                refreshed: Some(epoch_ms_now()),
            });
        }

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(UplinkError::NotFound {
                package: name.to_string(),
                uplink: self.name().to_string(),
            });
        }

        if !resp.status().is_success() {
            return Err(UplinkError::RemoteStatus {
                uplink: self.name().to_string(),
                status: resp.status().as_u16(),
            });
        }

        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|h| h.to_str().ok())
            .map(String::from);

        let body = resp
            .into_body()
            .read_to_vec()
            .map_err(|err| UplinkError::FailedToFetch {
                uplink: self.name().to_string(),
                reason: err.to_string(),
            })?;

        let document: PackageDocument = serde_json::from_slice(&body)?;
        validate_metadata(&document, name)?;

        Ok(FetchOutcome::Fresh {
            document,
            etag,
            fetched: epoch_ms_now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uplink(max_age: &str) -> Uplink {
        Uplink::new(UplinkConfig {
            name: "upstream".to_string(),
            url: "https://registry.example.org/".to_string(),
            max_age: Some(max_age.to_string()),
            timeout: Some("5s".to_string()),
        })
    }

    #[test]
    fn test_package_url_encodes_scoped_names() {
        let up = uplink("2m");
        assert_eq!(
            up.package_url("left-pad"),
            "https://registry.example.org/left-pad"
        );
        assert_eq!(
            up.package_url("@scope/pkg"),
            "https://registry.example.org/@scope%2Fpkg"
        );
    }

    #[test]
    fn test_fresh_cache_short_circuits_without_network() {
        let up = uplink("1h");
        let cache = UplinkCacheEntry {
            etag: Some("\"abc\"".to_string()),
            fetched: Some(epoch_ms_now()),
        };

        // the configured host does not resolve; reaching the network would fail
        let outcome = up.fetch_metadata("pkg", Some(&cache), false).unwrap();
        assert!(matches!(
            outcome,
            FetchOutcome::NotModified { refreshed: None }
        ));
    }

    #[test]
    fn test_stale_cache_hits_network() {
        let up = Uplink::new(UplinkConfig {
            name: "upstream".to_string(),
            // unroutable per RFC 5737, fails fast without DNS
            url: "http://192.0.2.1:9".to_string(),
            max_age: Some("0s".to_string()),
            timeout: Some("1s".to_string()),
        });
        let cache = UplinkCacheEntry {
            etag: None,
            fetched: Some(epoch_ms_now().saturating_sub(60_000)),
        };

        let err = up.fetch_metadata("pkg", Some(&cache), false).unwrap_err();
        assert!(matches!(err, UplinkError::FailedToFetch { .. }));
    }
}
