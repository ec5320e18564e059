//! Registrant resolution for server IP addresses.

use crate::Error;
use crate::upstream::{RegistrantInfo, RegistrantLookup, RegistrantRecord};

/// Country code and owning organization of one IP address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registrant {
    pub country: String,
    pub organization: String,
}

/// Pick the registrant fields to report from a WHOIS record.
///
/// The primary registry record wins unless both of its fields are empty,
/// in which case the first sub-record is used (when there is one).
pub fn select_registrant(record: RegistrantRecord) -> Registrant {
    let info = match record.sub_record {
        Some(sub) if record.primary.is_empty() => sub,
        _ => record.primary,
    };

    let RegistrantInfo { organization, country_code } = info;
    Registrant { country: country_code, organization }
}

/// Look up `ip_address` and resolve its registrant.
pub async fn resolve(lookup: &dyn RegistrantLookup, ip_address: &str) -> Result<Registrant, Error> {
    let record = lookup.lookup(ip_address).await?;
    let used_sub_record = record.primary.is_empty() && record.sub_record.is_some();

    let registrant = select_registrant(record);
    tracing::debug!(
        ip_address,
        country = %registrant.country,
        organization = %registrant.organization,
        used_sub_record,
        "resolved registrant"
    );

    Ok(registrant)
}
