//! Client configuration and the process-wide default.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::error::EndpointError;

pub const ENV_API_HOST: &str = "EMPIRICAL_API_HOST";
pub const ENV_ACCESS_TOKEN: &str = "EMPIRICAL_ACCESS_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "EMPIRICAL_TIMEOUT_SECS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const API_PREFIX: &str = "/api/v1";

/// Connection settings shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub api_host: String,
    pub access_token: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Configuration {
    pub fn new(api_host: impl Into<String>) -> Self {
        Self {
            api_host: api_host.into(),
            access_token: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("empirical-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn from_env() -> Result<Self, EndpointError> {
        let host = std::env::var(ENV_API_HOST)
            .map_err(|_| EndpointError::Configuration(format!("{ENV_API_HOST} is not set")))?;
        let mut config = Configuration::new(host);

        if let Ok(token) = std::env::var(ENV_ACCESS_TOKEN) {
            if !token.is_empty() {
                config.access_token = Some(token);
            }
        }

        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                EndpointError::Configuration(format!("{ENV_TIMEOUT_SECS} must be an integer, got {raw:?}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// `{api_host}/api/v1` with doubled slashes collapsed, except the one
    /// following a scheme colon.
    pub fn api_base(&self) -> String {
        collapse_slashes(&format!("{}{API_PREFIX}", self.api_host))
    }
}

fn collapse_slashes(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let mut prev: Option<char> = None;
    let mut before_prev: Option<char> = None;
    for c in url.chars() {
        if c == '/' && prev == Some('/') && before_prev != Some(':') {
            continue;
        }
        out.push(c);
        before_prev = prev;
        prev = Some(c);
    }
    out
}

static DEFAULT_CONFIGURATION: OnceLock<Arc<Configuration>> = OnceLock::new();

/// Get the process-wide configuration, loading it from the environment on
/// first use.
pub fn default_configuration() -> Result<Arc<Configuration>, EndpointError> {
    if let Some(config) = DEFAULT_CONFIGURATION.get() {
        return Ok(config.clone());
    }

    let config = Arc::new(Configuration::from_env()?);
    Ok(DEFAULT_CONFIGURATION.get_or_init(|| config).clone())
}

/// Install the process-wide configuration. Fails if one is already set.
pub fn set_default_configuration(config: Configuration) -> Result<(), EndpointError> {
    DEFAULT_CONFIGURATION
        .set(Arc::new(config))
        .map_err(|_| EndpointError::Configuration("default configuration already set".to_string()))
}
