//! Upstream transport clients for hostgrade.
//!
//! This crate provides reqwest-backed implementations of the core provider
//! traits (SSL analysis, WHOIS registrant lookup, landing-page scraping)
//! plus validation of user-supplied hostnames.

pub mod host;
pub mod http;
pub mod page;
pub mod ssllabs;
pub mod whois;

pub use host::{HostError, parse_host};
pub use http::{HttpConfig, build_client};
pub use page::{PageClient, extract_page_info};
pub use ssllabs::SslLabsClient;
pub use whois::WhoisClient;
