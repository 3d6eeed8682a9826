use std::{collections::HashSet, fs, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{ConfigError, Result},
    uplink::UplinkConfig,
};

/// Registry configuration.
///
/// Loaded once at startup and passed explicitly to every component; there
/// is no ambient global.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Root directory for package documents and tarballs.
    pub storage: PathBuf,

    /// Optional URL prefix prepended when rewriting tarball URLs to point
    /// at this server.
    pub url_prefix: Option<String>,

    /// Publish behavior.
    #[serde(default)]
    pub publish: PublishPolicy,

    /// Upstream registries, in merge priority order.
    ///
    /// Within one metadata read the uplinks are contacted and merged in
    /// exactly this order; for conflicting tags/readme/time the last
    /// declared uplink wins.
    #[serde(default)]
    pub uplinks: Vec<UplinkConfig>,
}

/// Controls how publishes behave when uplinks are unreachable.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PublishPolicy {
    /// Allow publishing a new package while an uplink cannot be reached.
    /// When false (the default), a failing uplink existence check refuses
    /// the publish so a public package cannot be shadowed by accident.
    /// Default: false
    pub allow_offline: Option<bool>,
}

impl PublishPolicy {
    pub fn allow_offline(&self) -> bool {
        self.allow_offline.unwrap_or(false)
    }
}

impl Config {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Read`] if the file cannot be read.
    /// * [`ConfigError::Parse`] if it is not valid TOML.
    /// * [`ConfigError::Invalid`] if the content fails validation
    ///   (empty storage path, duplicate or malformed uplinks).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            source: err,
        })?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;

        info!(
            storage = %config.storage.display(),
            uplinks = config.uplinks.len(),
            "configuration loaded"
        );

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.storage.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage path is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for uplink in &self.uplinks {
            if uplink.name.is_empty() {
                return Err(ConfigError::Invalid("uplink with empty name".to_string()));
            }
            if uplink.url.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "uplink `{}` has an empty url",
                    uplink.name
                )));
            }
            if !seen.insert(uplink.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate uplink name `{}`",
                    uplink.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_minimal() {
        let file = write_config(r#"storage = "/srv/wharf/storage""#);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.storage, PathBuf::from("/srv/wharf/storage"));
        assert!(config.uplinks.is_empty());
        assert!(!config.publish.allow_offline());
    }

    #[test]
    fn test_load_with_uplinks_keeps_order() {
        let file = write_config(
            r#"
storage = "/srv/wharf/storage"

[publish]
allow_offline = true

[[uplinks]]
name = "mirror"
url = "https://mirror.example.org"
max_age = "10m"

[[uplinks]]
name = "upstream"
url = "https://registry.example.org"
"#,
        );

        let config = Config::load(file.path()).unwrap();
        assert!(config.publish.allow_offline());
        let names: Vec<_> = config.uplinks.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["mirror", "upstream"]);
        assert_eq!(config.uplinks[0].max_age_ms(), 600_000);
    }

    #[test]
    fn test_duplicate_uplink_rejected() {
        let file = write_config(
            r#"
storage = "/srv/wharf/storage"

[[uplinks]]
name = "upstream"
url = "https://a.example.org"

[[uplinks]]
name = "upstream"
url = "https://b.example.org"
"#,
        );

        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::load("/path/does/not/exist.toml"),
            Err(ConfigError::Read { .. })
        ));
    }
}
