use serde::{Deserialize, Serialize};
use wharf_utils::time::parse_duration;

/// Defines one upstream registry this node proxies and merges metadata from.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UplinkConfig {
    /// Unique identifier of the uplink. Used as the key of the per-package
    /// `_uplinks` cache and as the provenance marker for merged versions.
    pub name: String,

    /// Base URL of the upstream registry.
    pub url: String,

    /// How long a fetched metadata document stays fresh (e.g. "2m", "1h").
    /// While fresh, metadata reads skip the network entirely.
    /// Default: "2m"
    pub max_age: Option<String>,

    /// Request timeout (e.g. "30s").
    /// Default: "30s"
    pub timeout: Option<String>,
}

impl UplinkConfig {
    /// Staleness window in milliseconds.
    pub fn max_age_ms(&self) -> u128 {
        self.max_age
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(2 * 60 * 1000)
    }

    /// Request timeout in milliseconds.
    pub fn timeout_ms(&self) -> u128 {
        self.timeout
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(30 * 1000)
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}
