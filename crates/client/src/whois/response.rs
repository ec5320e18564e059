//! WhoisXML response types and normalization.
//!
//! Only the registrant fields are decoded. The primary registry record
//! keys the country as `countryCode`; sub-records key it as `country`.
//! The `WhoisRecord` envelope itself is required: error bodies such as
//! `{"ErrorMessage": ...}` can arrive with a 200 status.

use serde::Deserialize;

use hostgrade_core::upstream::{RegistrantInfo, RegistrantRecord};

/// Raw response envelope from the WHOIS service.
#[derive(Debug, Deserialize)]
pub struct WhoisResponse {
    #[serde(rename = "WhoisRecord")]
    pub record: WhoisRecord,
}

#[derive(Debug, Default, Deserialize)]
pub struct WhoisRecord {
    #[serde(rename = "registryData", default)]
    pub registry_data: RegistryData,
    #[serde(rename = "subRecords", default)]
    pub sub_records: Vec<SubRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegistryData {
    #[serde(default)]
    pub registrant: PrimaryRegistrant,
}

#[derive(Debug, Default, Deserialize)]
pub struct PrimaryRegistrant {
    #[serde(default)]
    pub organization: String,
    #[serde(rename = "countryCode", default)]
    pub country_code: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubRecord {
    #[serde(default)]
    pub registrant: SubRegistrant,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubRegistrant {
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub country: String,
}

impl From<WhoisResponse> for RegistrantRecord {
    fn from(raw: WhoisResponse) -> Self {
        let WhoisRecord { registry_data, sub_records } = raw.record;
        let primary = RegistrantInfo {
            organization: registry_data.registrant.organization,
            country_code: registry_data.registrant.country_code,
        };
        let sub_record = sub_records.into_iter().next().map(|sub| RegistrantInfo {
            organization: sub.registrant.organization,
            country_code: sub.registrant.country,
        });

        RegistrantRecord { primary, sub_record }
    }
}
