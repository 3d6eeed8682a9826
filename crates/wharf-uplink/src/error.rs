//! Error types for the uplink crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while fetching metadata from an upstream registry.
#[derive(Error, Diagnostic, Debug)]
pub enum UplinkError {
    #[error("Package `{package}` not found on uplink `{uplink}`")]
    #[diagnostic(code(wharf_uplink::not_found))]
    NotFound { package: String, uplink: String },

    #[error("Uplink `{uplink}` answered with status {status}")]
    #[diagnostic(
        code(wharf_uplink::remote_status),
        help("The upstream registry is reachable but unhealthy")
    )]
    RemoteStatus { uplink: String, status: u16 },

    #[error("Failed to fetch from uplink `{uplink}`: {reason}")]
    #[diagnostic(
        code(wharf_uplink::fetch),
        help("Check your network connection and the uplink URL")
    )]
    FailedToFetch { uplink: String, reason: String },

    #[error("Invalid URL: {0}")]
    #[diagnostic(code(wharf_uplink::invalid_url))]
    InvalidUrl(String),

    #[error(transparent)]
    #[diagnostic(
        code(wharf_uplink::json),
        help("The uplink response body is not valid metadata JSON")
    )]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(wharf_uplink::validation))]
    Validation(#[from] wharf_package::PackageError),
}

impl UplinkError {
    /// Whether this error means "the uplink simply doesn't carry the
    /// package", which is non-fatal to merges and publish existence
    /// checks.
    pub fn is_not_found(&self) -> bool {
        matches!(self, UplinkError::NotFound { .. })
    }
}

/// A specialized Result type for uplink operations.
pub type Result<T> = std::result::Result<T, UplinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        let err = UplinkError::NotFound {
            package: "pkg".to_string(),
            uplink: "upstream".to_string(),
        };
        assert!(err.is_not_found());

        let err = UplinkError::RemoteStatus {
            uplink: "upstream".to_string(),
            status: 500,
        };
        assert!(!err.is_not_found());
    }
}
