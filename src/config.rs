use crate::core::{Result, TrackerError};
use std::time::Duration;

pub const ENV_URL: &str = "TRACKER_URL";
pub const ENV_API_KEY: &str = "TRACKER_API_KEY";
pub const ENV_ACCESS_TOKEN: &str = "TRACKER_ACCESS_TOKEN";
/// Read by the binary for the application state file.
pub const ENV_STATE_PATH: &str = "TRACKER_STATE";

/// Remote store configuration
///
/// Built like a connection config: start from [`TrackerConfig::new`] or
/// [`TrackerConfig::from_env`] and chain setters.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Project base URL; the REST API lives under `/rest/v1`
    pub base_url: String,

    /// Public API key sent as the `apikey` header
    pub api_key: String,

    /// User access token; the API key is used when absent
    pub access_token: Option<String>,

    /// Per-request timeout
    pub request_timeout: Duration,

    pub opportunities_table: String,

    pub companies_table: String,
}

impl TrackerConfig {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(30),
            opportunities_table: "opportunities".to_string(),
            companies_table: "companies".to_string(),
        }
    }

    /// Reads `TRACKER_URL`, `TRACKER_API_KEY` and optionally
    /// `TRACKER_ACCESS_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(ENV_URL)
            .map_err(|_| TrackerError::Config(format!("{} is not set", ENV_URL)))?;
        let api_key = std::env::var(ENV_API_KEY)
            .map_err(|_| TrackerError::Config(format!("{} is not set", ENV_API_KEY)))?;

        let mut config = Self::new(&base_url, &api_key);
        if let Ok(token) = std::env::var(ENV_ACCESS_TOKEN) {
            config = config.access_token(&token);
        }
        config.validate()?;
        Ok(config)
    }

    /// Set the user access token
    pub fn access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    /// Set the per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn opportunities_table(mut self, table: &str) -> Self {
        self.opportunities_table = table.to_string();
        self
    }

    pub fn companies_table(mut self, table: &str) -> Self {
        self.companies_table = table.to_string();
        self
    }

    /// Token sent as the bearer credential.
    pub fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }

    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(TrackerError::Config(format!(
                "base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(TrackerError::Config("API key cannot be empty".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(TrackerError::Config(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        for table in [&self.opportunities_table, &self.companies_table] {
            if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(TrackerError::Config(format!("invalid table name '{}'", table)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chains_and_trims_base_url() {
        let config = TrackerConfig::new("https://project.example.co/", "anon-key")
            .access_token("user-jwt")
            .request_timeout(Duration::from_secs(5))
            .opportunities_table("pipeline");

        assert_eq!(
            config.rest_url(&config.opportunities_table),
            "https://project.example.co/rest/v1/pipeline"
        );
        assert_eq!(config.bearer(), "user-jwt");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(TrackerConfig::new("ftp://x", "key").validate().is_err());
        assert!(TrackerConfig::new("https://x", " ").validate().is_err());
        assert!(
            TrackerConfig::new("https://x", "key")
                .companies_table("companies;drop")
                .validate()
                .is_err()
        );
        assert!(
            TrackerConfig::new("https://x", "key")
                .request_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }
}
