//! Construction-time settings for `EventStoreClient`.
//!
//! A `ClientConfig` is validated once and never mutated afterwards; the
//! client owns it for its whole lifetime.

use std::fmt;
use std::time::Duration;

use crate::error::ApiError;

pub const ENV_API_URL: &str = "EVENTSTORE_API_URL";
pub const ENV_API_VERSION: &str = "EVENTSTORE_API_VERSION";
pub const ENV_API_TOKEN: &str = "EVENTSTORE_API_TOKEN";

pub const DEFAULT_API_VERSION: &str = "v1";

/// Upper bound on a fully-buffered response body.
pub const DEFAULT_MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct ClientConfig {
    api_url: String,
    api_version: String,
    auth_token: String,
    timeout: Option<Duration>,
    max_body_bytes: u64,
}

impl ClientConfig {
    /// Validate and build a configuration. Fails if any argument is empty.
    /// Values are kept as given; only trailing `/` is dropped from the URL.
    pub fn new(api_url: &str, api_version: &str, auth_token: &str) -> Result<Self, ApiError> {
        for (field, value) in [
            ("api_url", api_url),
            ("api_version", api_version),
            ("auth_token", auth_token),
        ] {
            if value.is_empty() {
                return Err(ApiError::Configuration(format!("{field} must not be empty")));
            }
        }

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
            auth_token: auth_token.to_string(),
            timeout: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Read `EVENTSTORE_API_URL`, `EVENTSTORE_API_VERSION` and
    /// `EVENTSTORE_API_TOKEN`. The version defaults to `v1`.
    pub fn from_env() -> Result<Self, ApiError> {
        let url = std::env::var(ENV_API_URL).unwrap_or_default();
        let version =
            std::env::var(ENV_API_VERSION).unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());
        let token = std::env::var(ENV_API_TOKEN).unwrap_or_default();
        Self::new(&url, &version, &token)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn max_body_bytes(&self) -> u64 {
        self.max_body_bytes
    }

    /// `{api_url}/api/{api_version}/{endpoint}`
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/api/{}/{}",
            self.api_url,
            self.api_version,
            endpoint.trim_start_matches('/')
        )
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field("api_version", &self.api_version)
            .field("auth_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_non_empty_settings() {
        let config = ClientConfig::new("http://localhost:3000", "v1", "secret").unwrap();
        assert_eq!(config.api_url(), "http://localhost:3000");
        assert_eq!(config.api_version(), "v1");
        assert_eq!(config.auth_token(), "secret");
        assert_eq!(config.timeout(), None);
        assert_eq!(config.max_body_bytes(), DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn rejects_each_empty_setting() {
        for (url, version, token, field) in [
            ("", "v1", "secret", "api_url"),
            ("http://localhost:3000", "", "secret", "api_version"),
            ("http://localhost:3000", "v1", "", "auth_token"),
        ] {
            let err = ClientConfig::new(url, version, token).unwrap_err();
            match err {
                ApiError::Configuration(msg) => assert!(msg.starts_with(field), "{msg}"),
                other => panic!("expected configuration error, got {other:?}"),
            }
        }
    }

    #[test]
    fn token_is_kept_byte_for_byte() {
        let config = ClientConfig::new("http://localhost:3000", "v1", "   ").unwrap();
        assert_eq!(config.auth_token(), "   ");

        let config = ClientConfig::new("http://localhost:3000", "v1", " tok ").unwrap();
        assert_eq!(config.auth_token(), " tok ");
    }

    #[test]
    fn endpoint_url_interpolates_version() {
        let config = ClientConfig::new("http://localhost:3000/", "v1", "secret").unwrap();
        assert_eq!(config.endpoint_url("stream"), "http://localhost:3000/api/v1/stream");
        assert_eq!(
            config.endpoint_url("/status/ping"),
            "http://localhost:3000/api/v1/status/ping"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let config = ClientConfig::new("http://localhost:3000", "v1", "secret").unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn builder_knobs() {
        let config = ClientConfig::new("http://localhost:3000", "v1", "secret")
            .unwrap()
            .with_timeout(Duration::from_secs(5))
            .with_max_body_bytes(1024);
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.max_body_bytes(), 1024);
    }
}
