use std::fmt;
use std::time::Duration;

pub const REST_API_PATH: &str = "/rest/v1";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Clone)]
pub struct PolarionConfig {
    pub base_url: String,
    pub token: String,
    pub connect_timeout: Duration,
}

impl Default for PolarionConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

// Keeps the bearer token out of logs.
impl fmt::Debug for PolarionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolarionConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl PolarionConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Server root without trailing slashes, as used for browser links.
    pub fn server_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// REST base path ending in exactly one `/rest/v1`.
    pub fn rest_base_url(&self) -> String {
        let trimmed = self.server_url();
        if trimmed.ends_with(REST_API_PATH) {
            trimmed.to_string()
        } else {
            format!("{}{}", trimmed, REST_API_PATH)
        }
    }

    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// URL and token stay opaque; the URL only has to parse, which the client checks.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }

        if self.connect_timeout.is_zero() {
            return Err("Connect timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PolarionConfig::default();
        assert!(config.base_url.is_empty());
        assert_eq!(config.connect_timeout, Duration::from_secs(600));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = PolarionConfig::new("https://host/polarion", "abc")
            .with_connect_timeout(Duration::from_secs(30));

        assert_eq!(config.base_url, "https://host/polarion");
        assert_eq!(config.token, "abc");
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rest_base_url_normalization() {
        let inputs = [
            "https://host/polarion",
            "https://host/polarion/",
            "https://host/polarion/rest/v1",
            "https://host/polarion/rest/v1/",
        ];
        for input in inputs {
            let config = PolarionConfig::new(input, "abc");
            assert_eq!(config.rest_base_url(), "https://host/polarion/rest/v1", "{input}");
        }
    }

    #[test]
    fn test_server_url_strips_trailing_slash() {
        let config = PolarionConfig::new("https://host/polarion/", "abc");
        assert_eq!(config.server_url(), "https://host/polarion");
    }

    #[test]
    fn test_authorization_header() {
        let config = PolarionConfig::new("https://host", "abc");
        assert_eq!(config.authorization(), "Bearer abc");
    }

    #[test]
    fn test_config_validation() {
        let mut config = PolarionConfig::new("https://host", "abc");

        config.base_url = "".to_string();
        assert!(config.validate().is_err());

        config.base_url = "http://host".to_string();
        config.connect_timeout = Duration::from_secs(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_leaves_url_and_token_opaque() {
        let config = PolarionConfig::new("ftp://host/polarion", "");
        assert!(config.validate().is_ok());
        assert_eq!(config.authorization(), "Bearer ");
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = PolarionConfig::new("https://host", "super-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
