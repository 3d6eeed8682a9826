use std::time::Duration;

use ureq::Agent;

/// Default user agent sent with every uplink request.
pub const USER_AGENT: &str = concat!("wharf/", env!("CARGO_PKG_VERSION"));

/// HTTP client settings for one uplink.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: Some(USER_AGENT.into()),
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Builds an HTTP `Agent` from this config.
    ///
    /// Non-2xx statuses are reported as responses, not transport errors;
    /// the uplink client needs to see 304 and 404 answers itself.
    pub fn build(&self) -> Agent {
        let mut config = ureq::Agent::config_builder()
            .timeout_global(self.timeout)
            .http_status_as_error(false);

        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent);
        }

        config.build().into()
    }
}
