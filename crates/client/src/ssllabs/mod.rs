//! SSL Labs API client.
//!
//! One `GET {base}/analyze?host=<host>` per call. The first request for a
//! host starts an assessment and later requests report its progress, so
//! re-polling is left to the core analysis poller.

pub mod response;

pub use response::{AnalyzeResponse, EndpointData};

use async_trait::async_trait;
use reqwest::header;

use hostgrade_core::Error;
use hostgrade_core::upstream::{AnalysisReport, SslAnalyzer};

use crate::http::{self, HttpConfig};

const PROVIDER: &str = "ssllabs";

/// SSL Labs analyzer client.
#[derive(Debug, Clone)]
pub struct SslLabsClient {
    http: reqwest::Client,
    base_url: String,
}

impl SslLabsClient {
    pub fn new(base_url: impl Into<String>, config: &HttpConfig) -> Result<Self, Error> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http: http::build_client(config)?, base_url })
    }
}

#[async_trait]
impl SslAnalyzer for SslLabsClient {
    async fn fetch_report(&self, host: &str) -> Result<AnalysisReport, Error> {
        let url = format!("{}/analyze", self.base_url);
        tracing::debug!(host, "requesting ssl analysis");

        let response = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .query(&[("host", host)])
            .send()
            .await
            .map_err(|e| http::transport_error(PROVIDER, e))?;

        let response = http::ensure_success(PROVIDER, response)?;
        let raw: AnalyzeResponse = http::read_json(PROVIDER, response).await?;

        Ok(AnalysisReport::from(raw))
    }
}
