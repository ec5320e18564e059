//! Application configuration with layered loading.
//!
//! Configuration is loaded with figment from, in increasing precedence:
//!
//! 1. Built-in defaults
//! 2. TOML config file (if HOSTGRADE_CONFIG_FILE set)
//! 3. Environment variables (HOSTGRADE_*)

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding domain records.
    ///
    /// Set via HOSTGRADE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Socket address the HTTP server listens on.
    ///
    /// Set via HOSTGRADE_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// User-Agent string for upstream requests.
    ///
    /// Set via HOSTGRADE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-call transport timeout in milliseconds.
    ///
    /// Set via HOSTGRADE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Base URL of the SSL Labs v3 API.
    #[serde(default = "default_ssl_labs_url")]
    pub ssl_labs_url: String,

    /// Endpoint of the WHOIS registrant lookup service.
    #[serde(default = "default_whois_url")]
    pub whois_url: String,

    /// API key for the WHOIS service.
    ///
    /// Set via HOSTGRADE_WHOIS_API_KEY environment variable.
    #[serde(default)]
    pub whois_api_key: Option<String>,

    /// Seconds to wait between analyzer polls while analysis is pending.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Wall-clock budget in seconds for a single analysis.
    #[serde(default = "default_poll_budget_secs")]
    pub poll_budget_secs: u64,

    /// Maximum bytes read when scraping a landing page.
    #[serde(default = "default_max_page_bytes")]
    pub max_page_bytes: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./hostgrade.sqlite")
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".into()
}

fn default_user_agent() -> String {
    "hostgrade/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_ssl_labs_url() -> String {
    "https://api.ssllabs.com/api/v3".into()
}

fn default_whois_url() -> String {
    "https://www.whoisxmlapi.com/whoisserver/WhoisService".into()
}

fn default_poll_interval_secs() -> u64 {
    15
}

fn default_poll_budget_secs() -> u64 {
    120
}

fn default_max_page_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            ssl_labs_url: default_ssl_labs_url(),
            whois_url: default_whois_url(),
            whois_api_key: None,
            poll_interval_secs: default_poll_interval_secs(),
            poll_budget_secs: default_poll_budget_secs(),
            max_page_bytes: default_max_page_bytes(),
        }
    }
}

impl AppConfig {
    /// Transport timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn poll_budget(&self) -> Duration {
        Duration::from_secs(self.poll_budget_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file or environment cannot be
    /// parsed, or if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("HOSTGRADE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HOSTGRADE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the WHOIS API key is not set.
    pub fn require_whois_api_key(&self) -> Result<&str, ConfigError> {
        self.whois_api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "whois_api_key".into(),
                hint: "Set HOSTGRADE_WHOIS_API_KEY environment variable".into(),
            })
    }
}
