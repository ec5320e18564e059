//! Landing-page metadata scraper.
//!
//! Fetches `http://<host>/` and reads two things from the markup:
//!
//! - the text of the first `<title>`
//! - the `href` of the first `<link>` whose `rel` is `icon` or `shortcut icon`
//!
//! The body is read up to a byte cap and parsed whatever the status code,
//! so an error page still yields its title.

use std::net::Ipv6Addr;

use async_trait::async_trait;
use reqwest::header;
use scraper::{Html, Selector};

use hostgrade_core::Error;
use hostgrade_core::upstream::{PageInfo, PageScraper};

use crate::http::{self, HttpConfig};

/// Default maximum page body size (5MB).
pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;

const PROVIDER: &str = "page";

/// HTTP page scraper.
#[derive(Debug, Clone)]
pub struct PageClient {
    http: reqwest::Client,
    max_bytes: usize,
}

impl PageClient {
    pub fn new(config: &HttpConfig, max_bytes: usize) -> Result<Self, Error> {
        Ok(Self { http: http::build_client(config)?, max_bytes })
    }

    /// Read at most `max_bytes` of the body.
    async fn read_capped(&self, mut response: reqwest::Response) -> Result<Vec<u8>, Error> {
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| http::transport_error(PROVIDER, e))? {
            let room = self.max_bytes - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                tracing::debug!(max_bytes = self.max_bytes, "page body truncated");
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl PageScraper for PageClient {
    async fn fetch_page_info(&self, host: &str) -> Result<PageInfo, Error> {
        let url = match host.parse::<Ipv6Addr>() {
            Ok(_) => format!("http://[{host}]/"),
            Err(_) => format!("http://{host}/"),
        };
        tracing::debug!(%url, "fetching landing page");

        let response = self
            .http
            .get(&url)
            .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| http::transport_error(PROVIDER, e))?;

        tracing::debug!(status = response.status().as_u16(), final_url = %response.url(), "landing page response");

        let body = self.read_capped(response).await?;
        extract_page_info(&String::from_utf8_lossy(&body))
    }
}

/// Pull the title and icon link out of an HTML document.
pub fn extract_page_info(html: &str) -> Result<PageInfo, Error> {
    let title_selector = selector("title")?;
    let link_selector = selector("link[rel][href]")?;
    let document = Html::parse_document(html);

    let title = document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let logo = document
        .select(&link_selector)
        .find(|el| el.value().attr("rel").is_some_and(is_icon_rel))
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string)
        .unwrap_or_default();

    Ok(PageInfo { title, logo })
}

fn selector(css: &str) -> Result<Selector, Error> {
    Selector::parse(css).map_err(|e| Error::DecodeFailure(format!("invalid selector {css:?}: {e}")))
}

fn is_icon_rel(rel: &str) -> bool {
    let rel = rel.trim();
    rel.eq_ignore_ascii_case("icon") || rel.eq_ignore_ascii_case("shortcut icon")
}
