//! Shared reqwest setup for the upstream clients.
//!
//! - User-Agent and per-call timeout come from configuration
//! - Max redirects: 5
//! - Transport failures and non-success statuses become `UpstreamUnavailable`

use std::time::Duration;

use reqwest::{Client, Response};

use hostgrade_core::{AppConfig, Error};

/// Transport settings shared by every upstream client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// User agent string (default: "hostgrade/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { user_agent: "hostgrade/0.1".to_string(), timeout: Duration::from_millis(20000), max_redirects: 5 }
    }
}

impl From<&AppConfig> for HttpConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// Build a reqwest client for the given settings.
pub fn build_client(config: &HttpConfig) -> Result<Client, Error> {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout)
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .use_rustls_tls()
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .map_err(|e| Error::UpstreamUnavailable(format!("failed to build HTTP client: {e}")))
}

/// Map a reqwest failure for `provider` to the unified error.
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::UpstreamUnavailable(format!("{provider}: request timed out"))
    } else {
        Error::UpstreamUnavailable(format!("{provider}: network error: {err}"))
    }
}

/// Reject non-success statuses.
pub(crate) fn ensure_success(provider: &str, response: Response) -> Result<Response, Error> {
    let status = response.status();
    tracing::debug!(provider, status = status.as_u16(), url = %response.url(), "upstream response");

    if !status.is_success() {
        return Err(Error::UpstreamUnavailable(format!("{provider}: status {}", status.as_u16())));
    }
    Ok(response)
}

/// Decode a JSON body, reporting malformed payloads as `DecodeFailure`.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(provider: &str, response: Response) -> Result<T, Error> {
    let bytes = response.bytes().await.map_err(|e| transport_error(provider, e))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::DecodeFailure(format!("{provider}: {e}")))
}
