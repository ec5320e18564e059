//! Provider seams for the three upstream data sources.
//!
//! Transport clients live in `hostgrade-client`; the refresh pipeline only
//! sees these traits and the normalized records they return, so tests can
//! substitute in-memory fakes.

use async_trait::async_trait;

use crate::Error;

/// Analyzer progress as reported on each poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisStatus {
    Dns,
    InProgress,
    Ready,
    Error,
    /// Anything else the analyzer sends back.
    Other(String),
}

impl AnalysisStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "DNS" => AnalysisStatus::Dns,
            "IN_PROGRESS" => AnalysisStatus::InProgress,
            "READY" => AnalysisStatus::Ready,
            "ERROR" => AnalysisStatus::Error,
            other => AnalysisStatus::Other(other.to_string()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AnalysisStatus::Dns | AnalysisStatus::InProgress)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Ready | AnalysisStatus::Error)
    }

    /// Liveness implied by a terminal status: `ERROR` means the host is down.
    pub fn is_down(&self) -> bool {
        matches!(self, AnalysisStatus::Error)
    }
}

/// One analyzed endpoint of a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub ip_address: String,
    pub grade: String,
}

/// A single analyzer response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    pub status: AnalysisStatus,
    pub endpoints: Vec<Endpoint>,
}

/// Registrant fields of one WHOIS record shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrantInfo {
    pub organization: String,
    pub country_code: String,
}

impl RegistrantInfo {
    pub fn is_empty(&self) -> bool {
        self.organization.is_empty() && self.country_code.is_empty()
    }
}

/// Registrant data for one IP address.
///
/// `sub_record` is the first entry of the provider's sub-record list, when
/// the provider sent one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrantRecord {
    pub primary: RegistrantInfo,
    pub sub_record: Option<RegistrantInfo>,
}

/// Title and favicon scraped from a landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub title: String,
    pub logo: String,
}

/// TLS configuration analyzer. One call is one poll.
#[async_trait]
pub trait SslAnalyzer: Send + Sync {
    async fn fetch_report(&self, host: &str) -> Result<AnalysisReport, Error>;
}

/// Registrant (WHOIS) lookup keyed by IP address.
#[async_trait]
pub trait RegistrantLookup: Send + Sync {
    async fn lookup(&self, ip_address: &str) -> Result<RegistrantRecord, Error>;
}

/// Landing-page metadata scraper.
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn fetch_page_info(&self, host: &str) -> Result<PageInfo, Error>;
}
