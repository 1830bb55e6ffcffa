//! Connector configuration
//!
//! `ConnectorConfig` holds everything a `HydraConnector` needs up front:
//! where the server lives, which credentials to present and how long to
//! wait. It is an explicit value handed to each connector instance.

use crate::auth::{BasicCredentials, SessionToken};
use std::time::Duration;

/// Environment variable holding a previously obtained session id
pub const ENV_SESSION: &str = "HYDRA_SESSION";

/// Environment variable holding the HTTP Basic username
pub const ENV_BASIC_USERNAME: &str = "HYDRA_HTTP_BASIC_USERNAME";

/// Environment variable holding the HTTP Basic password
pub const ENV_BASIC_PASSWORD: &str = "HYDRA_HTTP_BASIC_PASSWORD";

/// Default number of redirect hops followed by downloads
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Configuration for a Hydra connector
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Base URL of the Hydra instance
    pub base_url: String,
    /// HTTP Basic credentials, if the server sits behind Basic auth
    pub basic_auth: Option<BasicCredentials>,
    /// Session id restored from a previous login
    pub session: Option<SessionToken>,
    /// Timeout for each JSON request
    pub timeout: Duration,
    /// Timeout for establishing a connection
    pub connect_timeout: Duration,
    /// Total time limit for a download (none by default)
    pub download_timeout: Option<Duration>,
    /// Maximum redirect hops followed by a download
    pub max_redirects: u32,
    /// User agent string
    pub user_agent: String,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            basic_auth: None,
            session: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            download_timeout: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: format!("hydra-connect/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ConnectorConfig {
    /// Create a config for the given base URL with default settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Create a new config builder
    pub fn builder() -> ConnectorConfigBuilder {
        ConnectorConfigBuilder::default()
    }

    /// Create a config for `base_url`, taking credentials from the process
    /// environment (`HYDRA_SESSION`, `HYDRA_HTTP_BASIC_USERNAME`,
    /// `HYDRA_HTTP_BASIC_PASSWORD`)
    pub fn from_env(base_url: impl Into<String>) -> Self {
        Self::from_lookup(base_url, |key| std::env::var(key).ok())
    }

    /// Like [`ConnectorConfig::from_env`], reading variables through `lookup`
    pub fn from_lookup<F>(base_url: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let mut config = Self::new(base_url);
        config.session = var(ENV_SESSION).map(SessionToken::new);
        config.basic_auth = var(ENV_BASIC_USERNAME).map(|username| {
            BasicCredentials::new(username, var(ENV_BASIC_PASSWORD).unwrap_or_default())
        });
        config
    }
}

/// Builder for connector config
#[derive(Default)]
pub struct ConnectorConfigBuilder {
    config: ConnectorConfig,
}

impl ConnectorConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set HTTP Basic credentials
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.basic_auth = Some(BasicCredentials::new(username, password));
        self
    }

    /// Restore a session id
    pub fn session(mut self, token: impl Into<String>) -> Self {
        self.config.session = Some(SessionToken::new(token));
        self
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Limit the total duration of a download
    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.config.download_timeout = Some(timeout);
        self
    }

    /// Set the redirect hop limit for downloads
    pub fn max_redirects(mut self, max: u32) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> ConnectorConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = ConnectorConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.max_redirects, 5);
        assert!(config.download_timeout.is_none());
        assert!(config.basic_auth.is_none());
        assert!(config.session.is_none());
        assert!(config.user_agent.starts_with("hydra-connect/"));
    }

    #[test]
    fn test_config_builder() {
        let config = ConnectorConfig::builder()
            .base_url("https://hydra.example.org")
            .basic_auth("alice", "secret")
            .session("abc")
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(2))
            .download_timeout(Duration::from_secs(600))
            .max_redirects(2)
            .user_agent("test-agent/1.0")
            .build();

        assert_eq!(config.base_url, "https://hydra.example.org");
        assert_eq!(
            config.basic_auth,
            Some(BasicCredentials::new("alice", "secret"))
        );
        assert_eq!(config.session.as_ref().map(SessionToken::as_str), Some("abc"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.download_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.max_redirects, 2);
        assert_eq!(config.user_agent, "test-agent/1.0");
    }

    #[test]
    fn test_config_from_lookup() {
        let env: HashMap<&str, &str> = [
            (ENV_SESSION, "session-id"),
            (ENV_BASIC_USERNAME, "bob"),
            (ENV_BASIC_PASSWORD, "pw"),
        ]
        .into_iter()
        .collect();

        let config = ConnectorConfig::from_lookup("http://localhost", |k| {
            env.get(k).map(|v| (*v).to_string())
        });

        assert_eq!(config.base_url, "http://localhost");
        assert_eq!(
            config.session.as_ref().map(SessionToken::as_str),
            Some("session-id")
        );
        assert_eq!(config.basic_auth, Some(BasicCredentials::new("bob", "pw")));
    }

    #[test]
    fn test_config_from_lookup_ignores_empty_values() {
        let config = ConnectorConfig::from_lookup("http://localhost", |k| match k {
            ENV_SESSION => Some(String::new()),
            ENV_BASIC_PASSWORD => Some("orphan".to_string()),
            _ => None,
        });

        assert!(config.session.is_none());
        // A password without a username is not enough for Basic auth
        assert!(config.basic_auth.is_none());
    }

    #[test]
    fn test_config_from_lookup_username_only() {
        let config = ConnectorConfig::from_lookup("http://localhost", |k| {
            (k == ENV_BASIC_USERNAME).then(|| "carol".to_string())
        });

        assert_eq!(config.basic_auth, Some(BasicCredentials::new("carol", "")));
    }
}
