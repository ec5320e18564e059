//! Configuration validation rules.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `poll_interval_secs` is 0 or larger than `poll_budget_secs`
    /// - `max_page_bytes` is 0 or exceeds 50MB
    /// - `user_agent`, `bind_addr` or either upstream URL is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.poll_interval_secs == 0 {
            return Err(invalid("poll_interval_secs", "must be greater than 0"));
        }
        if self.poll_budget_secs < self.poll_interval_secs {
            return Err(invalid("poll_budget_secs", "must be at least poll_interval_secs"));
        }

        if self.max_page_bytes == 0 {
            return Err(invalid("max_page_bytes", "must be greater than 0"));
        }
        if self.max_page_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_page_bytes", "must not exceed 50MB"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.bind_addr.is_empty() {
            return Err(invalid("bind_addr", "must not be empty"));
        }
        if self.ssl_labs_url.is_empty() {
            return Err(invalid("ssl_labs_url", "must not be empty"));
        }
        if self.whois_url.is_empty() {
            return Err(invalid("whois_url", "must not be empty"));
        }

        if self.poll_budget_secs > 600 {
            tracing::warn!(
                poll_budget_secs = self.poll_budget_secs,
                "analysis budget exceeds 10 minutes; requests will block that long on slow analyses"
            );
        }

        Ok(())
    }
}
