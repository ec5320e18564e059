//! WhoisXML registrant lookup client.
//!
//! `GET {endpoint}?apiKey=<key>&outputFormat=JSON&domainName=<ip>`

pub mod response;

pub use response::WhoisResponse;

use async_trait::async_trait;
use reqwest::header;

use hostgrade_core::Error;
use hostgrade_core::upstream::{RegistrantLookup, RegistrantRecord};

use crate::http::{self, HttpConfig};

const PROVIDER: &str = "whois";

/// WHOIS registrant lookup client.
#[derive(Clone)]
pub struct WhoisClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for WhoisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhoisClient").field("endpoint", &self.endpoint).finish_non_exhaustive()
    }
}

impl WhoisClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, config: &HttpConfig) -> Result<Self, Error> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::InvalidInput("missing WHOIS API key".into()));
        }
        Ok(Self { http: http::build_client(config)?, endpoint: endpoint.into(), api_key })
    }
}

#[async_trait]
impl RegistrantLookup for WhoisClient {
    async fn lookup(&self, ip_address: &str) -> Result<RegistrantRecord, Error> {
        tracing::debug!(ip_address, "requesting registrant");

        let response = self
            .http
            .get(&self.endpoint)
            .header(header::ACCEPT, "application/json")
            .query(&[("apiKey", self.api_key.as_str()), ("outputFormat", "JSON"), ("domainName", ip_address)])
            .send()
            .await
            .map_err(|e| http::transport_error(PROVIDER, e))?;

        let response = http::ensure_success(PROVIDER, response)?;
        let raw: WhoisResponse = http::read_json(PROVIDER, response).await?;

        Ok(RegistrantRecord::from(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const TEST_ENDPOINT: &str = "https://whois.example.test/WhoisService";

    #[test]
    fn test_new_rejects_empty_key() {
        let result = WhoisClient::new(TEST_ENDPOINT, "", &HttpConfig::default());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_debug_hides_key() {
        let client = WhoisClient::new(TEST_ENDPOINT, "secret-key", &HttpConfig::default()).unwrap();
        assert!(!format!("{client:?}").contains("secret-key"));
    }

    #[tokio::test]
    async fn test_lookup_sends_key_and_ip() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/WhoisService")
                    .query_param("apiKey", "k-123")
                    .query_param("outputFormat", "JSON")
                    .query_param("domainName", "8.8.8.8");
                then.status(200).body(
                    r#"{"WhoisRecord":{"registryData":{"registrant":{"organization":"Google LLC","countryCode":"US"}}}}"#,
                );
            })
            .await;

        let client = WhoisClient::new(server.url("/WhoisService"), "k-123", &HttpConfig::default()).unwrap();
        let record = client.lookup("8.8.8.8").await.unwrap();

        mock.assert_async().await;
        assert_eq!(record.primary.organization, "Google LLC");
        assert_eq!(record.primary.country_code, "US");
    }

    #[tokio::test]
    async fn test_unauthorized_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/WhoisService");
                then.status(401).body(r#"{"ErrorMessage":{"msg":"ApiKey authenticate failed"}}"#);
            })
            .await;

        let client = WhoisClient::new(server.url("/WhoisService"), "bad", &HttpConfig::default()).unwrap();
        let result = client.lookup("8.8.8.8").await;
        assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_truncated_body_is_decode_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/WhoisService");
                then.status(200).body(r#"{"WhoisRecord":{"registryData""#);
            })
            .await;

        let client = WhoisClient::new(server.url("/WhoisService"), "k", &HttpConfig::default()).unwrap();
        let result = client.lookup("8.8.8.8").await;
        assert!(matches!(result, Err(Error::DecodeFailure(_))));
    }

    #[tokio::test]
    async fn test_error_message_with_ok_status_is_decode_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/WhoisService");
                then.status(200).body(r#"{"ErrorMessage":{"msg":"API key quota exceeded"}}"#);
            })
            .await;

        let client = WhoisClient::new(server.url("/WhoisService"), "k", &HttpConfig::default()).unwrap();
        let result = client.lookup("8.8.8.8").await;
        assert!(matches!(result, Err(Error::DecodeFailure(_))));
    }
}
