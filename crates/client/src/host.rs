//! Hostname validation for incoming domain requests.

use hostgrade_core::Error;
use url::Host;

/// Error type for hostname validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("empty host")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid label {0:?}")]
    InvalidLabel(String),

    #[error("top-level label {0:?} is not alphabetic")]
    InvalidTld(String),
}

impl From<HostError> for Error {
    fn from(err: HostError) -> Self {
        Error::InvalidInput(format!("Invalid domain name: {err}"))
    }
}

/// Validate a user-supplied host and return its normalized form.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Keep only the host (no port, path or query)
/// 4. Lowercase it
///
/// IP literals are accepted as-is. DNS names need at least two labels of
/// letters, digits and inner hyphens, with an alphabetic (or IDNA) last label.
pub fn parse_host(input: &str) -> Result<String, HostError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(HostError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let parsed = url::Url::parse(&url_str).map_err(|e| HostError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(HostError::UnsupportedScheme(scheme.to_string())),
    }

    match parsed.host() {
        Some(Host::Ipv4(ip)) => Ok(ip.to_string()),
        Some(Host::Ipv6(ip)) => Ok(ip.to_string()),
        Some(Host::Domain(domain)) => validate_domain(&domain.to_lowercase()),
        None => Err(HostError::Empty),
    }
}

fn validate_domain(domain: &str) -> Result<String, HostError> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    let labels: Vec<&str> = domain.split('.').collect();

    if labels.len() < 2 {
        return Err(HostError::InvalidTld(domain.to_string()));
    }

    for label in &labels {
        if !is_valid_label(label) {
            return Err(HostError::InvalidLabel(label.to_string()));
        }
    }

    let tld = labels[labels.len() - 1];
    if !(tld.starts_with("xn--") || tld.chars().all(|c| c.is_ascii_alphabetic())) {
        return Err(HostError::InvalidTld(tld.to_string()));
    }

    Ok(domain.to_string())
}

fn is_valid_label(label: &str) -> bool {
    (1..=63).contains(&label.len())
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
