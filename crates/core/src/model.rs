//! Domain records as stored and served.
//!
//! Field names on the serde side are the public wire contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One server endpoint behind a domain.
///
/// Equality is structural; change detection compares server lists
/// position by position with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub address: String,
    pub ssl_grade: String,
    pub country: String,
    pub owner: String,
}

/// Security posture and page metadata for a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub servers: Vec<Server>,
    pub servers_changed: bool,
    pub ssl_grade: String,
    pub previous_ssl_grade: String,
    pub logo: String,
    pub title: String,
    pub is_down: bool,
}

/// The persisted aggregate for one hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    #[serde(rename = "domainName")]
    pub name: String,
    #[serde(rename = "hostInfo")]
    pub host_info: HostInfo,
    /// Time of creation or of the last successful refresh.
    pub created_at: DateTime<Utc>,
}

/// Body of `GET /domains`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainList {
    pub items: Vec<Domain>,
}
