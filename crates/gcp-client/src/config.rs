//! Client configuration and builder pattern.

use crate::error::{GcpError, Result};
use std::time::Duration;

/// Public BigQuery REST endpoint.
pub const DEFAULT_BIGQUERY_URL: &str = "https://bigquery.googleapis.com";

/// Configuration for the BigQuery client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root (e.g. "https://bigquery.googleapis.com")
    pub base_url: String,
    /// Whole-request timeout. `None` (the default) waits indefinitely.
    pub timeout: Option<Duration>,
    /// Server-side wait per `getQueryResults` poll (default: 10 seconds)
    pub poll_wait: Duration,
    /// Rows per result page, `None` lets the server decide
    pub page_size: Option<u32>,
    /// Job location (e.g. "US", "EU"), `None` lets the server infer it
    pub location: Option<String>,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BIGQUERY_URL.to_string(),
            timeout: None,
            poll_wait: Duration::from_secs(10),
            page_size: None,
            location: None,
            user_agent: format!("bigdummy-gcp-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(base_url)
    }

    /// Minimum allowed timeout value.
    pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(GcpError::Config("base_url cannot be empty".to_string()));
        }

        url::Url::parse(&self.base_url)
            .map_err(|e| GcpError::Config(format!("Invalid base_url: {}", e)))?;

        if let Some(timeout) = self.timeout {
            if timeout < Self::MIN_TIMEOUT {
                return Err(GcpError::Config(format!(
                    "timeout ({:?}) must be >= {:?}",
                    timeout,
                    Self::MIN_TIMEOUT
                )));
            }
        }

        if self.poll_wait.is_zero() {
            return Err(GcpError::Config("poll_wait must be > 0".to_string()));
        }

        if self.page_size == Some(0) {
            return Err(GcpError::Config("page_size must be > 0".to_string()));
        }

        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Builder for client configuration.
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config: ClientConfig {
                base_url: base_url.into(),
                ..Default::default()
            },
        }
    }

    /// Set a whole-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set the server-side wait per result poll.
    pub fn poll_wait(mut self, wait: Duration) -> Self {
        self.config.poll_wait = wait;
        self
    }

    /// Set the number of rows requested per page.
    pub fn page_size(mut self, rows: u32) -> Self {
        self.config.page_size = Some(rows);
        self
    }

    /// Pin jobs to a location.
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.config.location = Some(location.into());
        self
    }

    /// Set a custom User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
